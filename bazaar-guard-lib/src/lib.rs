#![forbid(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod guard;
pub mod quota;
pub mod telemetry;

pub use config::{load_from_path, load_from_str, Config};
pub use error::{GuardError, Result};
pub use guard::{
    ActionType, CheckOptions, Guard, PatternKind, SuspiciousUser, UserId, Verdict, VerdictSource,
};
pub use quota::{HttpQuotaClient, QuotaCheck, QuotaDecision};
