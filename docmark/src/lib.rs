pub mod compile;
pub mod error;
pub mod operation;
pub mod parser;
pub mod tree;

pub use compile::{CompileOptions, IndexUnit, MAX_BASE_INDEX, compile, compile_with};
pub use error::{CompileError, Notice, NoticeKind};
pub use operation::{CompileResult, FormatOperation, IndexRange};
pub use tree::{NodeId, NodeKind, Tree};

/// Parse markdown source and compile it in one step.
pub fn compile_markdown(
    source: &str,
    options: &CompileOptions,
) -> Result<CompileResult, CompileError> {
    compile_with(&parser::parse(source), options)
}
