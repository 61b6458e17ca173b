use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::assets::SourceImage;
use crate::encode::{PNG_MIME, encode_png, to_data_uri};
use crate::fetch::CancelToken;
use crate::foundation::error::{TokenError, TokenResult};
use crate::model::settings::{ImageSettings, TokenStyle};
use crate::model::team::Team;
use crate::observe::{ChangeListener, ListenerGroups, ListenerId, Observable, Property, lock};
use crate::pipeline::{StyledImage, TokenPipeline};

/// Image-related slice of saved character data.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CharacterImageData {
    /// `data:` URI or URL of the portrait.
    #[serde(rename = "unStyledImage")]
    pub unstyled_image: Option<String>,
    pub team: Team,
    pub image_settings: TokenStyle,
}

impl CharacterImageData {
    pub fn from_json(s: &str) -> TokenResult<Self> {
        let data: Self = serde_json::from_str(s)?;
        data.image_settings.validate()?;
        Ok(data)
    }

    pub fn to_json(&self) -> TokenResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Default)]
struct RegenState {
    running: bool,
    dirty: bool,
    suspended: usize,
}

struct Inner {
    unstyled: Property<Option<SourceImage>>,
    team: Property<Team>,
    settings: ImageSettings,
    styled: Property<Option<StyledImage>>,
    loading: Property<bool>,
    pipeline: TokenPipeline,
    regen: Mutex<RegenState>,
    /// Bumped on every request; a run only commits if nothing newer was requested meanwhile.
    generation: AtomicU64,
    runs: AtomicU64,
    last_error: Mutex<Option<String>>,
    groups: ListenerGroups,
}

/// A character's portrait, team and styling, plus the token derived from them.
///
/// Any change to the portrait, team or a styling field regenerates the styled image. Requests
/// that arrive while a regeneration runs are folded into one more run by the thread that is
/// already running, so only the settled inputs are committed. A failed run keeps the previous
/// styled image.
///
/// Cloning yields another handle to the same character.
#[derive(Clone)]
pub struct Character {
    inner: Arc<Inner>,
}

impl Character {
    pub fn new(pipeline: TokenPipeline) -> Self {
        let inner = Arc::new(Inner {
            unstyled: Property::new(None),
            team: Property::new(Team::default()),
            settings: ImageSettings::default(),
            styled: Property::new(None),
            loading: Property::new(false),
            pipeline,
            regen: Mutex::new(RegenState::default()),
            generation: AtomicU64::new(0),
            runs: AtomicU64::new(0),
            last_error: Mutex::new(None),
            groups: ListenerGroups::default(),
        });

        let weak = Arc::downgrade(&inner);
        let regen: ChangeListener = Arc::new(move || {
            if let Some(c) = Self::upgrade(&weak) {
                // Failures are logged and recorded by the run itself.
                let _ = c.request_regeneration();
            }
        });
        inner.unstyled.add_change_listener(Arc::clone(&regen));
        inner.team.add_change_listener(Arc::clone(&regen));
        inner.settings.add_change_listener(regen);

        Self { inner }
    }

    /// Character populated from saved data, with its styled image generated once.
    pub fn with_data(pipeline: TokenPipeline, data: &CharacterImageData) -> TokenResult<Self> {
        let c = Self::new(pipeline);
        c.apply_data(data)?;
        Ok(c)
    }

    fn upgrade(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub fn unstyled_image(&self) -> &Property<Option<SourceImage>> {
        &self.inner.unstyled
    }

    pub fn team(&self) -> &Property<Team> {
        &self.inner.team
    }

    pub fn image_settings(&self) -> &ImageSettings {
        &self.inner.settings
    }

    pub fn styled_image(&self) -> Option<StyledImage> {
        self.inner.styled.get()
    }

    pub fn on_styled_change(
        &self,
        f: impl Fn(&Option<StyledImage>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.inner.styled.add_listener(f)
    }

    pub fn remove_styled_listener(&self, id: ListenerId) -> bool {
        self.inner.styled.remove_listener(id)
    }

    /// True while a regeneration is running.
    pub fn is_loading(&self) -> bool {
        self.inner.loading.get()
    }

    pub fn on_loading_change(&self, f: impl Fn(&bool) + Send + Sync + 'static) -> ListenerId {
        self.inner.loading.add_listener(f)
    }

    /// Number of pipeline runs performed so far, committed or not.
    pub fn regeneration_runs(&self) -> u64 {
        self.inner.runs.load(Ordering::Acquire)
    }

    /// Message of the most recent failed run, cleared by the next successful commit.
    pub fn last_error(&self) -> Option<String> {
        lock(&self.inner.last_error).clone()
    }

    /// Replace portrait, team and settings without regenerating per field, then regenerate once.
    pub fn apply_data(&self, data: &CharacterImageData) -> TokenResult<()> {
        data.image_settings.validate()?;
        let suspended = self.suspend_regeneration();
        self.inner
            .unstyled
            .set(data.unstyled_image.clone().map(SourceImage::from_reference));
        self.inner.team.set(data.team);
        self.inner.settings.apply(&data.image_settings);
        suspended.resume()
    }

    /// Current state as saved data. Decoded or raw-byte portraits are stored as data URIs.
    pub fn to_data(&self) -> TokenResult<CharacterImageData> {
        let unstyled_image = match self.inner.unstyled.get() {
            None => None,
            Some(SourceImage::DataUri(s) | SourceImage::Url(s)) => Some(s),
            Some(SourceImage::Bitmap(buf)) => Some(to_data_uri(PNG_MIME, &encode_png(&buf)?)),
            Some(SourceImage::Encoded(bytes)) => {
                let mime = image::guess_format(&bytes)
                    .map(|f| f.to_mime_type())
                    .map_err(|e| TokenError::decode(e.to_string()))?;
                Some(to_data_uri(mime, &bytes))
            }
        };
        Ok(CharacterImageData {
            unstyled_image,
            team: self.inner.team.get(),
            image_settings: self.inner.settings.snapshot(),
        })
    }

    /// Hold off listener-triggered regeneration until the guard drops; one run follows if any
    /// request arrived meanwhile.
    pub fn suspend_regeneration(&self) -> RegenSuspension {
        lock(&self.inner.regen).suspended += 1;
        RegenSuspension {
            character: self.clone(),
            finished: false,
        }
    }

    /// Drop one suspension level. Returns `(now_unsuspended, dirty)`.
    fn release_suspension(&self) -> (bool, bool) {
        let mut st = lock(&self.inner.regen);
        st.suspended = st.suspended.saturating_sub(1);
        let last = st.suspended == 0;
        let dirty = st.dirty;
        if last {
            st.dirty = false;
        }
        (last, dirty)
    }

    /// Regenerate now, or make the run already in progress go around once more.
    ///
    /// Returns the outcome of the last run performed on this call's thread; a request that is
    /// deferred to another thread's run or to the end of a suspension returns `Ok(())`.
    pub fn request_regeneration(&self) -> TokenResult<()> {
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        {
            let mut st = lock(&self.inner.regen);
            if st.suspended > 0 || st.running {
                st.dirty = true;
                return Ok(());
            }
            st.running = true;
        }

        self.inner.loading.set(true);
        let mut outcome;
        loop {
            outcome = self.run_once();
            let mut st = lock(&self.inner.regen);
            if st.dirty && st.suspended == 0 {
                st.dirty = false;
                continue;
            }
            st.running = false;
            break;
        }
        self.inner.loading.set(false);
        outcome
    }

    fn run_once(&self) -> TokenResult<()> {
        let inner = &self.inner;
        let generation = inner.generation.load(Ordering::Acquire);
        let source = inner.unstyled.get();
        let team = inner.team.get();
        let style = inner.settings.snapshot();
        inner.runs.fetch_add(1, Ordering::AcqRel);

        let res = inner
            .pipeline
            .render(source.as_ref(), team, &style, &CancelToken::new());

        match res {
            Ok(styled) => {
                if inner.generation.load(Ordering::Acquire) != generation {
                    tracing::debug!(generation, "discarding stale regeneration");
                    return Ok(());
                }
                *lock(&inner.last_error) = None;
                inner.styled.set(styled);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, recoverable = e.is_recoverable(), "regeneration failed");
                *lock(&inner.last_error) = Some(e.to_string());
                Err(e)
            }
        }
    }
}

impl Observable for Character {
    /// Fires when the portrait, team, a styling field or the styled image changes.
    fn add_change_listener(&self, listener: ChangeListener) -> ListenerId {
        let i = &self.inner;
        let members: [&dyn Observable; 4] = [&i.unstyled, &i.team, &i.settings, &i.styled];
        i.groups.add(&members, listener)
    }

    fn remove_change_listener(&self, id: ListenerId) -> bool {
        let i = &self.inner;
        let members: [&dyn Observable; 4] = [&i.unstyled, &i.team, &i.settings, &i.styled];
        i.groups.remove(&members, id)
    }
}

impl std::fmt::Debug for Character {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Character")
            .field("team", &self.inner.team.get())
            .field("has_source", &self.inner.unstyled.with(Option::is_some))
            .field("has_styled", &self.inner.styled.with(Option::is_some))
            .field("loading", &self.is_loading())
            .finish_non_exhaustive()
    }
}

/// Guard returned by [`Character::suspend_regeneration`].
///
/// Dropping it regenerates if anything changed meanwhile; [`RegenSuspension::resume`]
/// regenerates unconditionally.
#[must_use = "regeneration resumes when the guard is dropped"]
pub struct RegenSuspension {
    character: Character,
    finished: bool,
}

impl RegenSuspension {
    /// End the suspension and run one regeneration. Inside a nested suspension the run is
    /// deferred to the outermost guard.
    pub fn resume(mut self) -> TokenResult<()> {
        self.finished = true;
        let (last, _) = self.character.release_suspension();
        if last {
            self.character.request_regeneration()
        } else {
            lock(&self.character.inner.regen).dirty = true;
            Ok(())
        }
    }
}

impl Drop for RegenSuspension {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let (last, dirty) = self.character.release_suspension();
        if last && dirty {
            let _ = self.character.request_regeneration();
        }
    }
}

/// Regenerate many characters in parallel; their fetches still share one throttle.
pub fn regenerate_all(characters: &[Character]) -> Vec<TokenResult<()>> {
    characters
        .par_iter()
        .map(Character::request_regeneration)
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/model/character.rs"]
mod tests;
