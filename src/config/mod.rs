/// Main configuration module.
///
/// Re-exports submodules for game and session configuration.
pub mod game;
pub mod session;
