pub mod aircraft;
pub mod apply;
pub mod conflict;
pub mod deadline;
pub mod error;
pub mod hotspot;
pub mod intake;
pub mod models;
pub mod parsing;
pub mod pipeline;
pub mod resolver;
pub mod scoring;
pub mod spatial;
pub mod synthetic;
pub mod trajectory;

pub use aircraft::{classify, envelope_for, validate_flight, AircraftCategory, Envelope};
pub use apply::{apply_actions, insert_waypoint, Adjustment};
pub use conflict::{
    pair_key, Conflict, ConflictDetector, SeparationMinima, SeverityBand, PAIR_KEY_SEPARATOR,
};
pub use deadline::Deadline;
pub use error::{InsightError, Result};
pub use hotspot::{AltitudeBand, HotspotAnalyzer, HotspotCell, HotspotConfig};
pub use intake::{parse_batch, Batch};
pub use models::{Flight, FlightAction, GeoPoint, Trajectory, TrajectoryPoint};
pub use parsing::{format_route, format_waypoint, parse_route, parse_waypoint, route_points};
pub use pipeline::{AnalysisConfig, AnalysisReport, Analyzer, TrajectoryBatch};
pub use resolver::{ActionType, ResolutionCandidate, Resolver, ResolverConfig};
pub use scoring::ScoreWeights;
pub use spatial::great_circle_nm;
pub use synthetic::{generate, SyntheticConfig};
pub use trajectory::{build_trajectory, FlightPath, TrajectoryConfig};
