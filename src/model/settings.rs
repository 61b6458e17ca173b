use serde::{Deserialize, Serialize};

use crate::foundation::error::{TokenError, TokenResult};
use crate::observe::{ChangeListener, ListenerGroups, ListenerId, Observable, Property};

/// Largest accepted `borderIntensity`; it is the border blur radius in pixels.
pub const MAX_BORDER_INTENSITY: f64 = 64.0;
/// Largest accepted `dropShadowSize`, the shadow blur radius at full resolution.
pub const MAX_DROP_SHADOW_SIZE: f64 = 64.0;
/// `shrinkToFit` lies in `(0, MAX_SHRINK_TO_FIT]`; the placed icon never outgrows its region.
pub const MAX_SHRINK_TO_FIT: f64 = 1.0;

/// Plain record of every image-styling knob, as stored in saved character data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenStyle {
    /// When false the source image is passed through untouched.
    pub should_restyle: bool,
    /// Trim to visible pixels and place the icon into the usable region.
    pub should_reposition: bool,
    pub should_colorize: bool,
    /// Outsiders get their own gradient instead of the townsfolk one, minions instead of demon.
    pub use_outsider_and_minion_colors: bool,
    pub use_texture: bool,
    pub use_border: bool,
    /// `0` draws a hard 1px outline, anything above blurs the outline by that radius.
    pub border_intensity: f64,
    pub use_dropshadow: bool,
    pub drop_shadow_size: f64,
    pub drop_shadow_offset_x: f64,
    pub drop_shadow_offset_y: f64,
    pub drop_shadow_opacity: f64,
    /// Scale of the usable region a repositioned icon is fitted into, around the region's
    /// center. `1.0` fills the region.
    pub shrink_to_fit: f64,
}

impl Default for TokenStyle {
    fn default() -> Self {
        Self {
            should_restyle: true,
            should_reposition: true,
            should_colorize: true,
            use_outsider_and_minion_colors: true,
            use_texture: true,
            use_border: true,
            border_intensity: 1.0,
            use_dropshadow: true,
            drop_shadow_size: 16.0,
            drop_shadow_offset_x: 0.0,
            drop_shadow_offset_y: 10.0,
            drop_shadow_opacity: 0.5,
            shrink_to_fit: 1.0,
        }
    }
}

impl TokenStyle {
    /// Every toggle off except `should_restyle`; useful as a base for "only reposition".
    pub fn bare() -> Self {
        Self {
            should_reposition: false,
            should_colorize: false,
            use_outsider_and_minion_colors: false,
            use_texture: false,
            use_border: false,
            use_dropshadow: false,
            ..Self::default()
        }
    }

    pub fn from_json(s: &str) -> TokenResult<Self> {
        let style: Self = serde_json::from_str(s)?;
        style.validate()?;
        Ok(style)
    }

    pub fn to_json_pretty(&self) -> TokenResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> TokenResult<()> {
        let finite = [
            ("borderIntensity", self.border_intensity),
            ("dropShadowSize", self.drop_shadow_size),
            ("dropShadowOffsetX", self.drop_shadow_offset_x),
            ("dropShadowOffsetY", self.drop_shadow_offset_y),
            ("dropShadowOpacity", self.drop_shadow_opacity),
            ("shrinkToFit", self.shrink_to_fit),
        ];
        for (name, v) in finite {
            if !v.is_finite() {
                return Err(TokenError::validation(format!("{name} must be finite, got {v}")));
            }
        }
        if !(0.0..=MAX_BORDER_INTENSITY).contains(&self.border_intensity) {
            return Err(TokenError::validation(format!(
                "borderIntensity must be in [0, {MAX_BORDER_INTENSITY}], got {}",
                self.border_intensity
            )));
        }
        if !(0.0..=MAX_DROP_SHADOW_SIZE).contains(&self.drop_shadow_size) {
            return Err(TokenError::validation(format!(
                "dropShadowSize must be in [0, {MAX_DROP_SHADOW_SIZE}], got {}",
                self.drop_shadow_size
            )));
        }
        if !(0.0..=1.0).contains(&self.drop_shadow_opacity) {
            return Err(TokenError::validation("dropShadowOpacity must be in [0, 1]"));
        }
        if !(self.shrink_to_fit > 0.0 && self.shrink_to_fit <= MAX_SHRINK_TO_FIT) {
            return Err(TokenError::validation(format!(
                "shrinkToFit must be in (0, {MAX_SHRINK_TO_FIT}], got {}",
                self.shrink_to_fit
            )));
        }
        Ok(())
    }
}

macro_rules! image_settings {
    ($($field:ident: $ty:ty),* $(,)?) => {
        /// Observable bundle of [`TokenStyle`] fields, one [`Property`] per field.
        ///
        /// A change listener registered on the bundle fires once for every field that actually
        /// changes.
        pub struct ImageSettings {
            $(pub $field: Property<$ty>,)*
            groups: ListenerGroups,
        }

        impl ImageSettings {
            pub fn new(style: &TokenStyle) -> Self {
                Self {
                    $($field: Property::new(style.$field.clone()),)*
                    groups: ListenerGroups::default(),
                }
            }

            /// Current values as a plain record.
            pub fn snapshot(&self) -> TokenStyle {
                TokenStyle {
                    $($field: self.$field.get(),)*
                }
            }

            /// Store every field of `style`; returns how many fields changed.
            pub fn apply(&self, style: &TokenStyle) -> usize {
                let mut changed = 0;
                $(if self.$field.set(style.$field.clone()) {
                    changed += 1;
                })*
                changed
            }

            fn members(&self) -> Vec<&dyn Observable> {
                vec![$(&self.$field as &dyn Observable,)*]
            }
        }

        impl Observable for ImageSettings {
            fn add_change_listener(&self, listener: ChangeListener) -> ListenerId {
                self.groups.add(&self.members(), listener)
            }

            fn remove_change_listener(&self, id: ListenerId) -> bool {
                self.groups.remove(&self.members(), id)
            }
        }
    };
}

image_settings! {
    should_restyle: bool,
    should_reposition: bool,
    should_colorize: bool,
    use_outsider_and_minion_colors: bool,
    use_texture: bool,
    use_border: bool,
    border_intensity: f64,
    use_dropshadow: bool,
    drop_shadow_size: f64,
    drop_shadow_offset_x: f64,
    drop_shadow_offset_y: f64,
    drop_shadow_opacity: f64,
    shrink_to_fit: f64,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self::new(&TokenStyle::default())
    }
}

impl std::fmt::Debug for ImageSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ImageSettings").field(&self.snapshot()).finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/settings.rs"]
mod tests;
