/// Address the reference server listens on when none is given.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:1234";
