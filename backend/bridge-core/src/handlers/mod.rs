//! Block library actions.
//!
//! The four canonical actions and the collaborator traits a host implements
//! to serve them. [`BlockLibraryHandlers`] wires whichever collaborators the
//! host provides into a [`DispatchTable`]; actions without a collaborator are
//! left unregistered and answer `UNKNOWN_ACTION`.
//!
//! [`FileSystemLibrary`] is the stock tree and preview collaborator.

pub mod command;
pub mod insert;
pub mod preview;
pub mod tree;

pub use command::{CommandExecutor, CommandOutcome, ExecuteCommandRequest, ExecuteCommandResult};
pub use insert::{BlockInserter, InsertBlockRequest, Placement};
pub use preview::{PreviewMetadata, PreviewRequest, PreviewResult};
pub use tree::{FileInfo, IconType, NodeType, TreeNode, TreeRequest};

use crate::config::LibraryConfig;
use crate::error::HandlerError;
use crate::ipc::dispatch::DispatchTable;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::info;

pub mod actions {
    pub const GET_BLOCK_LIBRARY_TREE: &str = "GET_BLOCK_LIBRARY_TREE";
    pub const GET_FILE_PREVIEW: &str = "GET_FILE_PREVIEW";
    pub const INSERT_BLOCK: &str = "INSERT_BLOCK";
    pub const EXECUTE_COMMAND: &str = "EXECUTE_COMMAND";
}

/// Host side of `GET_BLOCK_LIBRARY_TREE`. Called on a blocking thread.
pub trait TreeBuilder: Send + Sync + 'static {
    fn build_tree(&self, root: &Path) -> Result<TreeNode, HandlerError>;
}

/// Host side of `GET_FILE_PREVIEW`. Called on a blocking thread; failures go
/// in the result.
pub trait PreviewBuilder: Send + Sync + 'static {
    fn build_preview(&self, file_path: &Path) -> PreviewResult;
}

/// Tree and preview straight from the filesystem.
#[derive(Debug, Clone, Copy)]
pub struct FileSystemLibrary {
    max_preview_bytes: u64,
}

impl FileSystemLibrary {
    pub fn new(max_preview_bytes: u64) -> Self {
        Self { max_preview_bytes }
    }
}

impl TreeBuilder for FileSystemLibrary {
    fn build_tree(&self, root: &Path) -> Result<TreeNode, HandlerError> {
        tree::build_tree(root)
    }
}

impl PreviewBuilder for FileSystemLibrary {
    fn build_preview(&self, file_path: &Path) -> PreviewResult {
        preview::build_preview(file_path, self.max_preview_bytes)
    }
}

pub struct BlockLibraryHandlers {
    default_root: Option<PathBuf>,
    command_timeout: Duration,
    max_preview_bytes: u64,
    tree: Option<Arc<dyn TreeBuilder>>,
    preview: Option<Arc<dyn PreviewBuilder>>,
    commands: Option<Arc<dyn CommandExecutor>>,
    inserter: Option<Arc<dyn BlockInserter>>,
}

impl BlockLibraryHandlers {
    pub fn new(library: &LibraryConfig) -> Self {
        Self {
            default_root: library.root_path.clone(),
            command_timeout: library.command_timeout(),
            max_preview_bytes: library.max_preview_bytes,
            tree: None,
            preview: None,
            commands: None,
            inserter: None,
        }
    }

    pub fn with_tree_builder(mut self, tree: Arc<dyn TreeBuilder>) -> Self {
        self.tree = Some(tree);
        self
    }

    pub fn with_preview_builder(mut self, preview: Arc<dyn PreviewBuilder>) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn with_command_executor(mut self, commands: Arc<dyn CommandExecutor>) -> Self {
        self.commands = Some(commands);
        self
    }

    pub fn with_block_inserter(mut self, inserter: Arc<dyn BlockInserter>) -> Self {
        self.inserter = Some(inserter);
        self
    }

    /// Shorthand for the filesystem tree and preview collaborators.
    pub fn with_file_system(self) -> Self {
        let library = Arc::new(FileSystemLibrary::new(self.max_preview_bytes));
        self.with_tree_builder(library.clone())
            .with_preview_builder(library)
    }

    /// Register one handler per provided collaborator.
    pub fn register(self, table: &mut DispatchTable) {
        if let Some(tree) = self.tree {
            let default_root = self.default_root;
            table.register_typed(
                actions::GET_BLOCK_LIBRARY_TREE,
                move |request: Option<TreeRequest>| {
                    let tree = Arc::clone(&tree);
                    let root = request
                        .and_then(|r| r.root_path)
                        .filter(|p| !p.as_os_str().is_empty())
                        .or_else(|| default_root.clone());
                    async move {
                        let root = root.ok_or_else(|| {
                            HandlerError::invalid_request(
                                "No RootPath given and no library root configured",
                            )
                        })?;
                        run_blocking(move || tree.build_tree(&root)).await
                    }
                },
            );
        }

        if let Some(preview) = self.preview {
            table.register_typed(actions::GET_FILE_PREVIEW, move |request: PreviewRequest| {
                let preview = Arc::clone(&preview);
                async move {
                    let path = request.file_path;
                    let fallback = path.clone();
                    let result = run_blocking(move || Ok(preview.build_preview(&path)))
                        .await
                        .unwrap_or_else(|e| PreviewResult::failed(&fallback, e.message));
                    Ok::<_, HandlerError>(result)
                }
            });
        }

        if let Some(commands) = self.commands {
            let limit = self.command_timeout;
            table.register_typed(
                actions::EXECUTE_COMMAND,
                move |request: ExecuteCommandRequest| {
                    command::execute_command(Arc::clone(&commands), request, limit)
                },
            );
        }

        if let Some(inserter) = self.inserter {
            table.register_typed(actions::INSERT_BLOCK, move |request: InsertBlockRequest| {
                insert::insert_block(Arc::clone(&inserter), request)
            });
        }

        info!("Block library actions registered: {:?}", table.actions());
    }
}

/// Run blocking collaborator work off the runtime threads.
async fn run_blocking<T, F>(work: F) -> Result<T, HandlerError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, HandlerError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| HandlerError::action_error(format!("Library task failed: {e}")))?
}
