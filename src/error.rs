use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    #[error("Task {0} has an empty task flow")]
    EmptyFlow(String),

    #[error("Task {task}: head operation {head} is not the last operation of the flow")]
    HeadNotLast { task: String, head: String },

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Task {task}: head module {module} is also used by the task body")]
    SharedHeadModule { task: String, module: String },

    #[error("Module {0} has no resolvable input/output dimensions")]
    MissingDims(String),

    #[error("Duplicate slice name: {0}")]
    DuplicateSlice(String),

    #[error("Task {0} already carries a slice combiner")]
    AlreadyExpanded(String),

    #[error("Operation {op} references {target}, which is not an earlier operation")]
    ForwardReference { op: String, target: String },

    #[error("Module name {0} is bound to two different modules")]
    ModuleConflict(String),

    #[error("Module {module} expected {expected} inputs, got {found}")]
    Arity {
        module: String,
        expected: String,
        found: usize,
    },

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("No labels registered for task {0}")]
    LabelsNotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
