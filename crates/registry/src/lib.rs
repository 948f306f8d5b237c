mod agent;
mod registry;
mod router;

pub use agent::{Agent, AgentMetadata, AgentRequest, Capability, RequestContext};
pub use registry::{AgentRegistry, AgentStatus, LifecycleState};
pub use router::{RouteInput, Router};
