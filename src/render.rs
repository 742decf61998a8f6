//! Rendering collaborator contract.
//!
//! The engine never draws. It hands each admitted effect to an
//! [`EffectRenderer`] and asks for it to be cleared on release. Both calls must
//! be idempotent and cheap; failures and panics are contained by [`guarded`]
//! at the call site.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use hashbrown::HashMap;
use thiserror::Error;

use crate::effects::{EffectKind, EffectTarget, IntensityClass};
use crate::error::EngineError;

/// Failure reported by a renderer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct RenderError(pub String);

impl RenderError {
    /// Wrap a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The draw surface, seen from the engine.
pub trait EffectRenderer {
    /// Show `kind` on `targets` at `class`.
    fn apply(
        &mut self,
        kind: EffectKind,
        targets: &[EffectTarget],
        class: IntensityClass,
    ) -> Result<(), RenderError>;

    /// Remove `kind` from `targets`. Clearing something not shown is a no-op.
    fn clear(&mut self, kind: EffectKind, targets: &[EffectTarget]) -> Result<(), RenderError>;
}

/// Renderer that draws nothing. The default collaborator.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRenderer;

impl EffectRenderer for NullRenderer {
    fn apply(&mut self, _: EffectKind, _: &[EffectTarget], _: IntensityClass) -> Result<(), RenderError> {
        Ok(())
    }

    fn clear(&mut self, _: EffectKind, _: &[EffectTarget]) -> Result<(), RenderError> {
        Ok(())
    }
}

// ─── SurfaceRecorder ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Surface {
    shown: HashMap<(EffectKind, EffectTarget), IntensityClass>,
    applies: u64,
    clears: u64,
    noop_clears: u64,
    fail_on: Option<EffectKind>,
}

/// In-memory surface that remembers what is shown where.
///
/// Clones share the same surface, so a test can keep one handle and give the
/// other to the engine.
#[derive(Clone, Debug, Default)]
pub struct SurfaceRecorder {
    inner: Rc<RefCell<Surface>>,
}

impl SurfaceRecorder {
    /// Empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `apply` of `kind` fail.
    pub fn fail_on(&self, kind: EffectKind) {
        self.inner.borrow_mut().fail_on = Some(kind);
    }

    /// `true` if `kind` is shown on any target.
    pub fn is_shown(&self, kind: EffectKind) -> bool {
        self.inner.borrow().shown.keys().any(|(k, _)| *k == kind)
    }

    /// Number of shown `(kind, target)` pairs.
    pub fn shown_count(&self) -> usize {
        self.inner.borrow().shown.len()
    }

    /// Successful `apply` calls.
    pub fn applies(&self) -> u64 {
        self.inner.borrow().applies
    }

    /// `clear` calls, including no-ops.
    pub fn clears(&self) -> u64 {
        self.inner.borrow().clears
    }

    /// `clear` calls that found nothing to remove.
    pub fn noop_clears(&self) -> u64 {
        self.inner.borrow().noop_clears
    }
}

impl EffectRenderer for SurfaceRecorder {
    fn apply(
        &mut self,
        kind: EffectKind,
        targets: &[EffectTarget],
        class: IntensityClass,
    ) -> Result<(), RenderError> {
        let mut surface = self.inner.borrow_mut();
        if surface.fail_on == Some(kind) {
            return Err(RenderError::new(format!("surface refused {kind}")));
        }
        for target in targets {
            surface.shown.insert((kind, *target), class);
        }
        surface.applies += 1;
        Ok(())
    }

    fn clear(&mut self, kind: EffectKind, targets: &[EffectTarget]) -> Result<(), RenderError> {
        let mut surface = self.inner.borrow_mut();
        surface.clears += 1;
        let mut removed = false;
        for target in targets {
            removed |= surface.shown.remove(&(kind, *target)).is_some();
        }
        if !removed {
            surface.noop_clears += 1;
        }
        Ok(())
    }
}

// ─── Call-site containment ──────────────────────────────────────────────────

/// Run a renderer call, turning both errors and panics into
/// [`EngineError::Render`].
pub(crate) fn guarded<F>(kind: EffectKind, call: F) -> Result<(), EngineError>
where
    F: FnOnce() -> Result<(), RenderError>,
{
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(EngineError::Render { kind, message: err.0 }),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "renderer panicked".to_string());
            Err(EngineError::Render { kind, message })
        }
    }
}
