pub mod annotate;
pub mod api_spec;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod logger;
pub mod registry;
pub mod resolver;
pub mod runner;
pub mod suite;

// Re-export commonly used types
pub use api_spec::{ApiSpec, Assertion, AssertionKind, Expectations, RequestBody};
pub use config::{ConfigLoader, DectestConfig};
pub use error::{AssertionFailure, ConfigurationError, DectestError, Result, TransportError};
pub use http::{ApiResponse, HttpTransport, Transport};
pub use registry::{HookPhase, IdentityToken, InstanceMode, MetadataRegistry, SuiteType};
pub use resolver::{ConflictPolicy, MemberRef, SpecResolver};
pub use runner::{RunSummary, SuiteReport, SuiteRunner, TestReporter};
pub use suite::{Declarations, RunFilter, Suite, SuiteOrchestrator, TestContext};
