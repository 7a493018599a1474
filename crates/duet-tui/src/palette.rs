//! 256-colour tags.
//!
//! Each client picks one tag at start-up and stamps it into everything it
//! sends. Indices 8, 15 and 16 are grey, white and black on common terminal
//! themes and would be unreadable as foreground colours, so they are never
//! chosen.

use duet_proto::ColorTag;
use rand::Rng;
use ratatui::style::Color;

/// Lowest tag handed out.
pub const MIN_TAG: ColorTag = 1;
/// Highest tag handed out.
pub const MAX_TAG: ColorTag = 229;

const EXCLUDED: [ColorTag; 3] = [8, 15, 16];

/// Whether `tag` may be chosen as a client colour.
pub fn is_allowed(tag: ColorTag) -> bool {
    (MIN_TAG..=MAX_TAG).contains(&tag) && !EXCLUDED.contains(&tag)
}

/// Pick a random allowed tag.
pub fn random_tag() -> ColorTag {
    random_tag_with(&mut rand::rng())
}

/// Pick a random allowed tag from `rng`.
pub fn random_tag_with<R: Rng>(rng: &mut R) -> ColorTag {
    loop {
        let tag = rng.random_range(MIN_TAG..=MAX_TAG);
        if is_allowed(tag) {
            return tag;
        }
    }
}

/// Terminal colour for a tag received from a peer.
///
/// Peers are not trusted to stay in range; anything outside the 256-colour
/// palette renders in the default foreground.
pub fn color(tag: ColorTag) -> Color {
    u8::try_from(tag).map_or(Color::Reset, Color::Indexed)
}
