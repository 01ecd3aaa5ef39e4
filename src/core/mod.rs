pub mod assembler;
pub mod config;
pub mod error;
pub mod history;
pub mod layout;
pub mod metrics;
pub mod registry;
pub mod sampler;
pub mod widget;

pub use assembler::{DashboardAssembler, DashboardContext, Environment, Theme};
pub use config::{ConfigLoader, LayoutConfig};
pub use error::{DashboardError, DashboardResult};
pub use history::{window_start, HistoryStore, SampleRow, SampleSink};
pub use layout::{Layout, Row, SPAN};
pub use registry::{SourceFactory, WidgetRegistry};
pub use sampler::{PeriodicSampler, SamplerSettings, SamplerState};
pub use widget::{Widget, WidgetKind};
