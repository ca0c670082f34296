//! Targeting selectors.
//!
//! A selector turns an action context into the ordered list of targets a
//! node runs against. The order is significant: nodes process targets in
//! exactly this order.

use crate::context::ActionContext;
use crate::encounter::Encounter;
use crate::entity::Target;
use crate::error::CombatError;
use crate::grid::{SpatialQuery, TileShape};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Strategy converting a context into concrete targets.
pub trait TargetingSelector: Send + Sync {
    fn select(&self, ctx: &ActionContext, encounter: &Encounter)
        -> Result<Vec<Target>, CombatError>;
}

/// Targets the acting character.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfTarget;

impl TargetingSelector for SelfTarget {
    fn select(
        &self,
        ctx: &ActionContext,
        encounter: &Encounter,
    ) -> Result<Vec<Target>, CombatError> {
        Ok(vec![encounter.character(ctx.source())?.as_target()])
    }
}

/// Targets whatever the context currently points at.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextTarget;

impl TargetingSelector for ContextTarget {
    fn select(
        &self,
        ctx: &ActionContext,
        _encounter: &Encounter,
    ) -> Result<Vec<Target>, CombatError> {
        Ok(vec![ctx.target().clone()])
    }
}

/// A fixed list, regardless of context.
#[derive(Debug, Clone, Default)]
pub struct FixedTargets(pub Vec<Target>);

impl TargetingSelector for FixedTargets {
    fn select(
        &self,
        _ctx: &ActionContext,
        _encounter: &Encounter,
    ) -> Result<Vec<Target>, CombatError> {
        Ok(self.0.clone())
    }
}

/// Which entities inside an area count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetFilter {
    #[default]
    Any,
    ExcludeSource,
    SourceOnly,
}

impl TargetFilter {
    fn keeps(self, ctx: &ActionContext, target: &Target) -> bool {
        match self {
            TargetFilter::Any => true,
            TargetFilter::ExcludeSource => &target.entity != ctx.source(),
            TargetFilter::SourceOnly => &target.entity == ctx.source(),
        }
    }
}

/// Every entity inside `shape`, centered on the context target's tile.
///
/// The center is the target's own tile if the context carries one,
/// otherwise the targeted character's position. A target with no position
/// yields no targets.
#[derive(Clone)]
pub struct AreaTarget {
    pub shape: TileShape,
    pub filter: TargetFilter,
    spatial: Arc<dyn SpatialQuery>,
}

impl AreaTarget {
    pub fn new(shape: TileShape, filter: TargetFilter, spatial: Arc<dyn SpatialQuery>) -> Self {
        Self {
            shape,
            filter,
            spatial,
        }
    }
}

impl fmt::Debug for AreaTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AreaTarget")
            .field("shape", &self.shape)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl TargetingSelector for AreaTarget {
    fn select(
        &self,
        ctx: &ActionContext,
        encounter: &Encounter,
    ) -> Result<Vec<Target>, CombatError> {
        let center = match ctx.target().tile {
            Some(tile) => Some(tile),
            None => encounter
                .find_character(&ctx.target().entity)
                .and_then(|c| c.tile()),
        };
        let Some(center) = center else {
            return Ok(Vec::new());
        };
        let tiles = self.shape.tiles(center);
        Ok(self
            .spatial
            .entities_on_tiles(encounter, &tiles)
            .into_iter()
            .filter(|t| self.filter.keeps(ctx, t))
            .collect())
    }
}
