pub mod activity;
pub mod cabinet;
pub mod cancellation;
pub mod config;
pub mod error;
pub mod filing;
pub mod http;
pub mod item;
pub mod location;
pub mod panel;
pub mod prediction;
pub mod search;
pub mod session;
pub mod storage;
pub mod testing;

pub use activity::{ActivityLog, ClientInfo, LogInfo};
pub use cabinet::{Cabinet, CabinetData, CabinetService};
pub use cancellation::{cancel_after, CancellationToken, CancellationTokenSource, Deadline};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use error::{ChainError, ChainErrorType, ErrorMessages, MessageType, UserMessage};
pub use http::{
    HttpPipeline, HttpTransport, RequestOutcome, RequestResult, RequestStatus, ReqwestTransport,
    RetryPolicy,
};
pub use item::{is_supported_item, CustomSubject, ItemDigest, MailItem};
pub use location::{LocationItem, PredictionData, QuickSearchData};
pub use panel::{FilingPanel, PanelHost, PanelState};
pub use prediction::PredictionCoordinator;
pub use search::SearchCoordinator;
pub use session::{AuthProvider, OAuthProvider, SessionContext, TokenData};
pub use storage::{open_storage, Storage, StorageType};
