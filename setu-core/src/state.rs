/// Trait alias for types that can serve as the gateway's application state.
///
/// The state type is used directly as the Axum router state. It must be
/// `Clone + Send + Sync + 'static`.
pub trait SetuState: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> SetuState for T {}
