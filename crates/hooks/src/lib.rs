pub mod hydrate;
pub mod options;
pub mod request;
pub mod store;
pub mod user;
pub mod wire;

pub use hydrate::{HydrationHandle, HydrationState, Hydrator, hydrate_user};
pub use options::RequestOptions;
pub use request::{EmptyParams, FunctionRequest, HookRequest, TriggerRequest};
pub use store::{MemoryUserStore, UserStore};
pub use user::{CloudUser, FieldPolicy, User, merge_field};
pub use wire::WireField;
