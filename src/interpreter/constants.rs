// Constants for the interpreter and tracer

/// First heap address; addresses double as `id()` values
pub const HEAP_ADDRESS_START: usize = 0x7f00_1000;

/// Maximum number of nested frames before `RecursionError`
pub const RECURSION_LIMIT: usize = 1000;

/// Stack size of the thread that executes user code.
/// Each interpreted frame costs several native frames, so the recursion
/// limit must trip long before the native stack does.
pub const EXECUTION_STACK_SIZE: usize = 512 * 1024 * 1024;

/// Upper bound on the number of nodes a linked rendering walks
pub const MAX_RENDERED_NODES: usize = 100;

/// Pseudo-filename the user code is compiled under
pub const PSEUDO_FILENAME: &str = "<string>";

/// Global that carries the split source lines
pub const CODE_LINES_GLOBAL: &str = "__code_lines__";

/// Name of the module-level frame
pub const MODULE_FUNCTION_NAME: &str = "<module>";

/// Substrings that cause the input to be rejected before execution
pub const DENYLIST: &[&str] = &[
    "import os",
    "import sys",
    "subprocess",
    "open(",
    "exec(",
    "eval(",
    "import shutil",
    "from os",
    "from sys",
    "socket",
    "threading",
    "multiprocessing",
];

/// Error reported for rejected input
pub const UNSAFE_CODE_MESSAGE: &str =
    "Unsafe code detected. Use of restricted functions/modules is not allowed.";
