//! These are all the types that pass between a compositing host and the particle field.
//!
//! Every message is a single line of JSON. The host writes `PluginInputMessages` to the plugin's
//! STDIN and reads `PluginOutputMessages` from its STDOUT.

#![expect(clippy::pub_use, reason = "This seems to come from the `bon` crate")]

/// An RGBA colour.
pub type Colour = (f32, f32, f32, f32);

/// Output from the plugin that renders pixels in the terminal.
#[derive(serde::Serialize, serde::Deserialize, bon::Builder, Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct Pixel {
    /// The coordinates of the pixel. [0, 0] is in the top-left. The y-axis is twice as long as the
    /// number of rows in the terminal because 2 "pixels" can fit in a single TTY cell using the
    /// UTF8 half-block trick: ▀▄▀▄
    pub coordinates: (u32, u32),
    /// An optional colour for the pixel. If `None` (or `null` in the case of JSON) is used then
    /// the default foreground colour is used.
    pub color: Option<Colour>,
}

/// The various kinds of messages that the host can send to the plugin.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum PluginInputMessages {
    /// Sent whenever the terminal resizes, and once at startup.
    #[serde(rename = "tty_resize")]
    TTYResize {
        /// The number of columns in the new terminal size.
        width: u16,
        /// The number of rows in the new terminal size.
        height: u16,
    },
    /// The pointer moved over the terminal.
    PointerMove {
        /// The column and row of the cell under the pointer. [0, 0] is in the top-left.
        coordinates: (u16, u16),
    },
    /// The pointer left the terminal.
    PointerLeave,
}

/// All the message kinds that the plugin can send to the host.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum PluginOutputMessages {
    /// A complete frame of pixels. Blank pixels are not included.
    OutputPixels(Vec<Pixel>),
}
