// Triple Check - Core Library
// Cascading three-layer validation: internal, external, reproducibility

pub mod audit;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod layers;
pub mod ledger;
pub mod record;
pub mod replay;
pub mod report;
pub mod session;
pub mod status;
pub mod store;
pub mod validator;

// Re-export commonly used types
pub use audit::{AuditEntry, AuditLog};
pub use collaborators::{
    ExternalSourceResult, ExternalVerifier, IndexLookup, IndexPanel, ReproducibilityIndex,
    VerifierPanel,
};
pub use config::{CallPolicy, LayerWeights, ValidatorConfig};
pub use error::{CollaboratorError, ConfigError};
pub use layers::{
    ExternalVerification, InternalVerification, LayerEvidence, LayerId, LayerOutcome,
    LayerResult, ReproducibilityTest, SubCheck,
};
pub use ledger::Ledger;
pub use record::{load_records, Record};
pub use replay::{Evidence, ReplayIndex, ReplayVerifier};
pub use report::{BatchReport, StatusCounts, ValidationReport};
pub use session::ValidationSession;
pub use status::ValidationStatus;
pub use store::{
    count_reports, get_audit_entries, get_reports_by_status, insert_report, insert_reports,
    setup_database,
};
pub use validator::TripleCheckValidator;
