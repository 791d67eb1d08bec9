use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::driver::ShaderDriver;

/// Size of the info log buffer, terminator included.
pub const INFO_LOG_CAPACITY: usize = 512;

/// Longest log text ever reported.
pub const MAX_LOG_BYTES: usize = INFO_LOG_CAPACITY - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn gl_type(self) -> u32 {
        match self {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "VERTEX",
            ShaderStage::Fragment => "FRAGMENT",
        }
    }

    fn object_name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex shader",
            ShaderStage::Fragment => "fragment shader",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single failure reported while building a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    FileRead {
        stage: ShaderStage,
        path: PathBuf,
        message: String,
    },
    Compile {
        stage: ShaderStage,
        log: String,
    },
    Link {
        log: String,
    },
}

impl Diagnostic {
    /// `VERTEX`, `FRAGMENT` or `PROGRAM`.
    pub fn scope(&self) -> &'static str {
        match self {
            Diagnostic::FileRead { stage, .. } | Diagnostic::Compile { stage, .. } => stage.label(),
            Diagnostic::Link { .. } => "PROGRAM",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::FileRead { .. } => "FILE_NOT_SUCCESSFULLY_READ",
            Diagnostic::Compile { .. } => "COMPILATION_FAILED",
            Diagnostic::Link { .. } => "LINKING_FAILED",
        }
    }

    /// Driver log text, empty for file errors.
    pub fn log(&self) -> &str {
        match self {
            Diagnostic::FileRead { .. } => "",
            Diagnostic::Compile { log, .. } | Diagnostic::Link { log } => log,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ERROR::SHADER::{}::{}", self.scope(), self.kind())?;
        match self {
            Diagnostic::FileRead { path, message, .. } => {
                write!(f, "\n{}: {}", path.display(), message)
            }
            Diagnostic::Compile { log, .. } | Diagnostic::Link { log } => write!(f, "\n{log}"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ShaderError {
    #[error("driver could not allocate a {object}: {message}")]
    Allocation {
        object: &'static str,
        message: String,
        /// Failures reported before the allocation was refused.
        diagnostics: Vec<Diagnostic>,
    },

    #[error("shader program failed to build ({} diagnostic(s))", .0.len())]
    Build(Vec<Diagnostic>),
}

impl ShaderError {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            ShaderError::Build(diagnostics) | ShaderError::Allocation { diagnostics, .. } => {
                diagnostics
            }
        }
    }

    /// Only a refused allocation leaves the driver unable to go on.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShaderError::Allocation { .. })
    }
}

/// Turns stage and link failures into "no program" so the caller can keep
/// running without activating anything. Allocation failures still propagate.
pub fn tolerate_build_failure<D: ShaderDriver>(
    result: Result<ShaderProgram<D>, ShaderError>,
) -> Result<Option<ShaderProgram<D>>, ShaderError> {
    match result {
        Ok(program) => Ok(Some(program)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!("{e}; continuing without a shader program");
            Ok(None)
        }
    }
}

/// Clips a driver log to [`MAX_LOG_BYTES`] without splitting a character.
pub fn truncate_log(log: String) -> String {
    let mut log = log.trim_end_matches(['\0', '\n', '\r', ' ']).to_string();
    if log.len() > MAX_LOG_BYTES {
        let mut end = MAX_LOG_BYTES;
        while !log.is_char_boundary(end) {
            end -= 1;
        }
        log.truncate(end);
    }
    log
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderSource {
    File(PathBuf),
    Inline(String),
}

impl ShaderSource {
    pub fn file(path: impl AsRef<Path>) -> Self {
        ShaderSource::File(path.as_ref().to_path_buf())
    }

    pub fn inline(source: impl Into<String>) -> Self {
        ShaderSource::Inline(source.into())
    }

    /// Reads the source text. An unreadable file yields empty text plus a
    /// diagnostic; the caller keeps going with what it got.
    fn load(&self, stage: ShaderStage) -> (String, Option<Diagnostic>) {
        match self {
            ShaderSource::Inline(text) => (text.clone(), None),
            ShaderSource::File(path) => match fs::read(path) {
                Ok(bytes) => (String::from_utf8_lossy(&bytes).into_owned(), None),
                Err(e) => (
                    String::new(),
                    Some(Diagnostic::FileRead {
                        stage,
                        path: path.clone(),
                        message: e.to_string(),
                    }),
                ),
            },
        }
    }
}

/// A linked program. Deleted from the driver when dropped.
pub struct ShaderProgram<D: ShaderDriver> {
    driver: Arc<D>,
    handle: D::Program,
}

impl<D: ShaderDriver> ShaderProgram<D> {
    pub fn handle(&self) -> D::Program {
        self.handle
    }

    /// Makes this program current for subsequent draws.
    pub fn activate(&self) {
        self.driver.use_program(Some(self.handle));
    }

    pub fn deactivate(&self) {
        self.driver.use_program(None);
    }
}

impl<D: ShaderDriver> fmt::Debug for ShaderProgram<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("handle", &self.handle)
            .finish()
    }
}

impl<D: ShaderDriver> Drop for ShaderProgram<D> {
    fn drop(&mut self) {
        debug!("Deleting shader program {:?}", self.handle);
        self.driver.delete_program(self.handle);
    }
}

/// Compiles a vertex and a fragment stage and links them.
///
/// Every stage runs even when an earlier one failed, so a single build
/// reports all of its problems at once. The stage objects are always released
/// before `build` returns.
#[derive(Debug, Clone)]
pub struct ProgramBuilder {
    vertex: ShaderSource,
    fragment: ShaderSource,
}

impl ProgramBuilder {
    pub fn new(vertex: ShaderSource, fragment: ShaderSource) -> Self {
        Self { vertex, fragment }
    }

    pub fn from_files(vertex_path: impl AsRef<Path>, fragment_path: impl AsRef<Path>) -> Self {
        Self::new(
            ShaderSource::file(vertex_path),
            ShaderSource::file(fragment_path),
        )
    }

    pub fn from_sources(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self::new(ShaderSource::inline(vertex), ShaderSource::inline(fragment))
    }

    pub fn build<D: ShaderDriver>(&self, driver: &Arc<D>) -> Result<ShaderProgram<D>, ShaderError> {
        let gl = driver.as_ref();
        let mut diagnostics = Vec::new();

        let vertex = compile_stage(gl, ShaderStage::Vertex, &self.vertex, &mut diagnostics)?;
        let fragment =
            match compile_stage(gl, ShaderStage::Fragment, &self.fragment, &mut diagnostics) {
                Ok(shader) => shader,
                Err(e) => {
                    gl.delete_shader(vertex);
                    return Err(e);
                }
            };

        let program = match gl.create_program() {
            Ok(program) => program,
            Err(message) => {
                gl.delete_shader(vertex);
                gl.delete_shader(fragment);
                return Err(ShaderError::Allocation {
                    object: "program",
                    message,
                    diagnostics,
                });
            }
        };

        gl.attach_shader(program, vertex);
        gl.attach_shader(program, fragment);

        if !gl.link_program(program) {
            let log = truncate_log(gl.program_info_log(program));
            report(&mut diagnostics, Diagnostic::Link { log });
        }

        // Linked or not, the stages are no longer needed.
        for shader in [vertex, fragment] {
            gl.detach_shader(program, shader);
            gl.delete_shader(shader);
        }

        if !diagnostics.is_empty() {
            gl.delete_program(program);
            return Err(ShaderError::Build(diagnostics));
        }

        debug!("Linked shader program {:?}", program);

        Ok(ShaderProgram {
            driver: Arc::clone(driver),
            handle: program,
        })
    }
}

fn report(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    error!("{diagnostic}");
    diagnostics.push(diagnostic);
}

fn compile_stage<D: ShaderDriver>(
    gl: &D,
    stage: ShaderStage,
    source: &ShaderSource,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<D::Shader, ShaderError> {
    let (text, read_error) = source.load(stage);
    if let Some(diagnostic) = read_error {
        report(diagnostics, diagnostic);
    }

    let shader = gl
        .create_shader(stage)
        .map_err(|message| ShaderError::Allocation {
            object: stage.object_name(),
            message,
            diagnostics: std::mem::take(diagnostics),
        })?;

    if !gl.compile_shader(shader, &text) {
        let log = truncate_log(gl.shader_info_log(shader));
        report(diagnostics, Diagnostic::Compile { stage, log });
    }

    Ok(shader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;

    use crate::driver::mock::{Call, MockDriver, SYNTAX_ERROR_LOG};

    const VERTEX: &str = include_str!("../shaders/core.vs");
    const FRAGMENT: &str = include_str!("../shaders/core.frag");

    const MISMATCHED_FRAGMENT: &str = "#version 330 core
in vec3 vertexColor;

out vec4 color;

void main()
{
    color = vec4(vertexColor, 1.0f);
}
";

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Runs `f` with warnings and errors written into the returned buffer.
    fn capture_logs(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, f);
        captured.text()
    }

    fn count(error: &ShaderError, scope: &str, kind: &str) -> usize {
        error
            .diagnostics()
            .iter()
            .filter(|d| d.scope() == scope && d.kind() == kind)
            .count()
    }

    #[test]
    fn valid_sources_link_and_activate() {
        let driver = Arc::new(MockDriver::new());
        let program = ProgramBuilder::from_sources(VERTEX, FRAGMENT)
            .build(&driver)
            .expect("program should link");

        program.activate();

        let calls = driver.calls();
        assert_eq!(
            calls.last(),
            Some(&Call::UseProgram(Some(program.handle())))
        );
        assert_eq!(driver.live_shaders(), 0);
        assert_eq!(driver.live_programs(), 1);
    }

    #[test]
    fn bundled_shader_files_build() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders");
        let driver = Arc::new(MockDriver::new());
        let program = ProgramBuilder::from_files(dir.join("core.vs"), dir.join("core.frag"))
            .build(&driver);

        assert!(program.is_ok(), "{:?}", program.err());
    }

    #[test]
    fn vertex_syntax_error_still_compiles_fragment_and_links() {
        let driver = Arc::new(MockDriver::new());
        let error = ProgramBuilder::from_sources("#version 330 core\nvoid mian() {}", FRAGMENT)
            .build(&driver)
            .unwrap_err();

        assert_eq!(count(&error, "VERTEX", "COMPILATION_FAILED"), 1);
        assert_eq!(count(&error, "FRAGMENT", "COMPILATION_FAILED"), 0);
        assert_eq!(error.diagnostics()[0].log(), SYNTAX_ERROR_LOG);

        let calls = driver.calls();
        assert!(calls.contains(&Call::CreateShader(ShaderStage::Fragment, 2)));
        assert!(calls.contains(&Call::CompileShader(2)));
        assert!(calls.iter().any(|c| matches!(c, Call::LinkProgram(_))));
    }

    #[test]
    fn mismatched_interface_reports_one_link_failure() {
        let driver = Arc::new(MockDriver::new());
        let error = ProgramBuilder::from_sources(VERTEX, MISMATCHED_FRAGMENT)
            .build(&driver)
            .unwrap_err();

        assert_eq!(error.diagnostics().len(), 1);
        assert_eq!(count(&error, "PROGRAM", "LINKING_FAILED"), 1);
        assert!(error.diagnostics()[0].log().contains("vertexColor"));
    }

    #[test]
    fn unreadable_file_is_reported_and_pipeline_continues() {
        let driver = Arc::new(MockDriver::new());
        let missing = Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders/missing.vs");
        let error = ProgramBuilder::new(ShaderSource::File(missing), ShaderSource::inline(FRAGMENT))
            .build(&driver)
            .unwrap_err();

        assert_eq!(count(&error, "VERTEX", "FILE_NOT_SUCCESSFULLY_READ"), 1);
        // The empty source then fails to compile, and the link fails with it.
        assert_eq!(count(&error, "VERTEX", "COMPILATION_FAILED"), 1);
        assert_eq!(count(&error, "PROGRAM", "LINKING_FAILED"), 1);
        assert!(matches!(error.diagnostics()[0], Diagnostic::FileRead { .. }));
    }

    #[test]
    fn stages_are_released_and_failed_program_deleted() {
        let driver = Arc::new(MockDriver::new());
        let _ = ProgramBuilder::from_sources("", "")
            .build(&driver)
            .unwrap_err();

        let calls = driver.calls();
        assert_eq!(
            calls.iter().filter(|c| matches!(c, Call::DeleteShader(_))).count(),
            2
        );
        assert!(calls.iter().any(|c| matches!(c, Call::DeleteProgram(_))));
        assert_eq!(driver.live_shaders(), 0);
        assert_eq!(driver.live_programs(), 0);
    }

    #[test]
    fn dropping_the_program_deletes_it() {
        let driver = Arc::new(MockDriver::new());
        let program = ProgramBuilder::from_sources(VERTEX, FRAGMENT)
            .build(&driver)
            .unwrap();
        let handle = program.handle();

        drop(program);

        assert_eq!(driver.calls().last(), Some(&Call::DeleteProgram(handle)));
        assert_eq!(driver.live_programs(), 0);
    }

    #[test]
    fn refused_program_allocation_releases_stages() {
        let driver = Arc::new(MockDriver::new().refusing_programs());
        let error = ProgramBuilder::from_sources(VERTEX, FRAGMENT)
            .build(&driver)
            .unwrap_err();

        assert!(matches!(error, ShaderError::Allocation { object: "program", .. }));
        assert_eq!(driver.live_shaders(), 0);
    }

    #[test]
    fn refused_allocation_keeps_earlier_diagnostics() {
        let driver = Arc::new(MockDriver::new().refusing_programs());
        let missing = Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders/missing.vs");
        let error = ProgramBuilder::new(ShaderSource::File(missing), ShaderSource::inline(FRAGMENT))
            .build(&driver)
            .unwrap_err();

        assert!(error.is_fatal());
        assert_eq!(count(&error, "VERTEX", "FILE_NOT_SUCCESSFULLY_READ"), 1);
        assert_eq!(count(&error, "VERTEX", "COMPILATION_FAILED"), 1);
    }

    #[test]
    fn clean_build_and_activation_log_nothing() {
        let driver = Arc::new(MockDriver::new());
        let logs = capture_logs(|| {
            let program = ProgramBuilder::from_sources(VERTEX, FRAGMENT)
                .build(&driver)
                .expect("program should link");
            program.activate();
        });

        assert_eq!(logs, "");
    }

    #[test]
    fn failed_build_writes_stage_diagnostics() {
        let driver = Arc::new(MockDriver::new());
        let logs = capture_logs(|| {
            let _ = ProgramBuilder::from_sources("", FRAGMENT).build(&driver);
        });

        assert_eq!(logs.matches("ERROR::SHADER::VERTEX::COMPILATION_FAILED").count(), 1);
        assert_eq!(logs.matches("ERROR::SHADER::PROGRAM::LINKING_FAILED").count(), 1);
        assert!(!logs.contains("FRAGMENT::COMPILATION_FAILED"));
    }

    #[test]
    fn stage_failures_leave_no_program_but_keep_running() {
        let driver = Arc::new(MockDriver::new());
        let result = ProgramBuilder::from_sources("", FRAGMENT).build(&driver);

        let program = tolerate_build_failure(result).expect("stage failures are not fatal");
        assert!(program.is_none());
        assert_eq!(driver.live_programs(), 0);
    }

    #[test]
    fn allocation_failures_still_propagate() {
        let driver = Arc::new(MockDriver::new().refusing_programs());
        let result = ProgramBuilder::from_sources(VERTEX, FRAGMENT).build(&driver);

        assert!(tolerate_build_failure(result).is_err());
    }

    #[test]
    fn successful_build_is_kept() {
        let driver = Arc::new(MockDriver::new());
        let result = ProgramBuilder::from_sources(VERTEX, FRAGMENT).build(&driver);

        assert!(tolerate_build_failure(result).unwrap().is_some());
    }

    #[test]
    fn long_driver_logs_are_clipped() {
        let driver = Arc::new(MockDriver::new().with_compile_log("e".repeat(2000)));
        let error = ProgramBuilder::from_sources("", FRAGMENT)
            .build(&driver)
            .unwrap_err();

        for diagnostic in error.diagnostics() {
            assert!(diagnostic.log().len() <= MAX_LOG_BYTES);
        }
        assert_eq!(error.diagnostics()[0].log().len(), MAX_LOG_BYTES);
    }

    #[test]
    fn truncation_keeps_utf8_intact() {
        let log = format!("{}é", "a".repeat(MAX_LOG_BYTES - 1));
        let clipped = truncate_log(log);

        assert_eq!(clipped.len(), MAX_LOG_BYTES - 1);
        assert!(clipped.chars().all(|c| c == 'a'));
    }

    #[test]
    fn truncation_strips_trailing_terminators() {
        assert_eq!(truncate_log("bad token\n\0".to_string()), "bad token");
    }

    #[test]
    fn diagnostics_use_stage_prefixes() {
        let compile = Diagnostic::Compile {
            stage: ShaderStage::Fragment,
            log: "oops".to_string(),
        };
        let link = Diagnostic::Link {
            log: "nope".to_string(),
        };

        assert_eq!(
            compile.to_string(),
            "ERROR::SHADER::FRAGMENT::COMPILATION_FAILED\noops"
        );
        assert_eq!(link.to_string(), "ERROR::SHADER::PROGRAM::LINKING_FAILED\nnope");
    }
}
