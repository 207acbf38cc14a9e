pub const EMPTY_PROGRAM: &str = "empty program";
pub const EXECUTION_TIMED_OUT: &str = "execution timed out";
