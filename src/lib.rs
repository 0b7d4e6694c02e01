// Library root
// -----------
// The binary (`main.rs`) drives these modules through an interactive
// terminal menu; everything except `ui` is usable without a terminal.
//
// Module responsibilities:
// - `api`: the HTTP transfer client (multipart upload to the
//   background-removal service) and the `Transfer` seam.
// - `handle`: image handles, files released when their owner drops them.
// - `view`: the view controller, i.e. the two panes plus the in-flight
//   request token.
// - `config`: service address and upload limit, env/file/defaults.
// - `error`: classified errors for the above.
// - `ui`: dialoguer menu, file picking, spinner and pane rendering.
pub mod api;
pub mod config;
pub mod error;
pub mod handle;
pub mod ui;
pub mod view;
