//! Callback and override-handler contracts.

/// Callback fired automatically when a mock is popped.
///
/// Arguments: the global 1-based call order, the stored mock payload
/// (`None` for empty mocks), and the spy bytes recorded by this pop
/// (`None` when the call site spied on nothing).
pub type MockCallback = Box<dyn FnMut(u32, Option<&[u8]>, Option<&[u8]>)>;

/// Handler installed by an override, supplanting the mock queue for its
/// declarator.
///
/// Arguments: the global 1-based call order, the 1-based per-declarator call
/// count, and the spy bytes passed to the pop. The returned bytes are handed
/// back to the caller of `pop` as the mock value (`None` behaves like an
/// empty mock).
pub type OverrideHandler = Box<dyn FnMut(u32, u32, Option<&[u8]>) -> Option<Vec<u8>>>;
