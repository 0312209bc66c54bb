//! Process exit codes. These are part of the public CI contract.

pub const PASS: i32 = 0;
/// Verdict fail, golden mismatch or integrity mismatch.
pub const REGRESSION: i32 = 1;
/// Not found, malformed config, I/O. Never a verdict.
pub const OPERATIONAL_ERROR: i32 = 2;

pub fn from_outcome(ok: bool) -> i32 {
    if ok {
        PASS
    } else {
        REGRESSION
    }
}
