//! Character-side state that feeds the token pipeline.

pub mod character;
pub mod settings;
pub mod team;

pub use character::{Character, CharacterImageData, RegenSuspension, regenerate_all};
pub use settings::{
    ImageSettings, MAX_BORDER_INTENSITY, MAX_DROP_SHADOW_SIZE, MAX_SHRINK_TO_FIT, TokenStyle,
};
pub use team::Team;
