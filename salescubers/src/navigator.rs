//! Drill-down / roll-up navigation over the three hierarchies.

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

use crate::analyzer::{CubeAnalysis, OlapAnalyzer};
use crate::classify::AggregationLevel;
use crate::config::NavigationConfig;
use crate::error::Result;
use crate::hierarchy::{self, Dimension};
use crate::models::AggregationRequest;
use crate::render::{group_thousands, NO_DATA};

/// Current level index per hierarchy, 0 being the coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationState {
    pub geo: usize,
    pub time: usize,
    pub product: usize,
}

impl NavigationState {
    pub fn index(&self, dimension: Dimension) -> usize {
        match dimension {
            Dimension::Geographic => self.geo,
            Dimension::Temporal => self.time,
            Dimension::Product => self.product,
        }
    }

    fn index_mut(&mut self, dimension: Dimension) -> &mut usize {
        match dimension {
            Dimension::Geographic => &mut self.geo,
            Dimension::Temporal => &mut self.time,
            Dimension::Product => &mut self.product,
        }
    }
}

impl Default for NavigationState {
    /// region / quarter / productGroup
    fn default() -> Self {
        Self {
            geo: 1,
            time: 1,
            product: 2,
        }
    }
}

/// Outcome of a drill or roll request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Transition {
    Moved {
        dimension: Dimension,
        from: &'static str,
        to: &'static str,
    },
    AlreadyFinest {
        dimension: Dimension,
        level: &'static str,
    },
    AlreadyCoarsest {
        dimension: Dimension,
        level: &'static str,
    },
}

impl Transition {
    pub fn moved(&self) -> bool {
        matches!(self, Transition::Moved { .. })
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Moved {
                dimension,
                from,
                to,
            } => write!(f, "{dimension}: {from} -> {to}"),
            Transition::AlreadyFinest { dimension, level } => {
                write!(f, "{dimension}: already at finest level ({level})")
            }
            Transition::AlreadyCoarsest { dimension, level } => {
                write!(f, "{dimension}: already at coarsest level ({level})")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrillNavigator {
    state: NavigationState,
    year: Option<i32>,
}

impl DrillNavigator {
    pub fn new(year: Option<i32>) -> Self {
        Self {
            state: NavigationState::default(),
            year,
        }
    }

    /// Start at the configured levels; unknown level names are rejected.
    pub fn from_config(config: &NavigationConfig) -> Result<Self> {
        Ok(Self {
            state: NavigationState {
                geo: hierarchy::level_index(Dimension::Geographic, &config.geo_level)?,
                time: hierarchy::level_index(Dimension::Temporal, &config.time_level)?,
                product: hierarchy::level_index(Dimension::Product, &config.product_level)?,
            },
            year: config.year,
        })
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn set_year(&mut self, year: Option<i32>) {
        self.year = year;
    }

    pub fn level(&self, dimension: Dimension) -> &'static str {
        dimension.hierarchy()[self.state.index(dimension)].name
    }

    pub fn drill_down(&mut self, dimension: Dimension) -> Transition {
        let levels = dimension.hierarchy();
        let idx = self.state.index_mut(dimension);
        let from = levels[*idx].name;
        if *idx + 1 >= levels.len() {
            return Transition::AlreadyFinest {
                dimension,
                level: from,
            };
        }
        *idx += 1;
        let to = levels[*idx].name;
        tracing::debug!(%dimension, from, to, "drill down");
        Transition::Moved {
            dimension,
            from,
            to,
        }
    }

    pub fn roll_up(&mut self, dimension: Dimension) -> Transition {
        let levels = dimension.hierarchy();
        let idx = self.state.index_mut(dimension);
        let from = levels[*idx].name;
        if *idx == 0 {
            return Transition::AlreadyCoarsest {
                dimension,
                level: from,
            };
        }
        *idx -= 1;
        let to = levels[*idx].name;
        tracing::debug!(%dimension, from, to, "roll up");
        Transition::Moved {
            dimension,
            from,
            to,
        }
    }

    pub fn current_request(&self) -> AggregationRequest {
        AggregationRequest::new(
            self.level(Dimension::Geographic),
            self.level(Dimension::Temporal),
            self.level(Dimension::Product),
            self.year,
        )
    }

    /// Each hierarchy as `level (Level i/n)` followed by the available moves.
    pub fn position(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Current navigation position:");
        for dimension in Dimension::ALL {
            let _ = writeln!(
                out,
                "  {dimension}: {} (Level {}/{})",
                self.level(dimension),
                self.state.index(dimension) + 1,
                dimension.hierarchy().len()
            );
        }

        let _ = writeln!(out, "Drill down:");
        for dimension in Dimension::ALL {
            let levels = dimension.hierarchy();
            let idx = self.state.index(dimension);
            match levels.get(idx + 1) {
                Some(next) => {
                    let _ = writeln!(out, "  {dimension}: {} -> {}", levels[idx].name, next.name);
                }
                None => {
                    let _ = writeln!(
                        out,
                        "  {dimension}: already at finest level ({})",
                        levels[idx].name
                    );
                }
            }
        }

        let _ = writeln!(out, "Roll up:");
        for dimension in Dimension::ALL {
            let levels = dimension.hierarchy();
            let idx = self.state.index(dimension);
            if idx == 0 {
                let _ = writeln!(
                    out,
                    "  {dimension}: already at coarsest level ({})",
                    levels[idx].name
                );
            } else {
                let _ = writeln!(
                    out,
                    "  {dimension}: {} -> {}",
                    levels[idx].name,
                    levels[idx - 1].name
                );
            }
        }
        out
    }
}

impl Default for DrillNavigator {
    fn default() -> Self {
        Self::new(Some(2019))
    }
}

/// Detail-level view of the navigator's current position.
#[derive(Debug, Clone, Serialize)]
pub struct LevelView {
    pub request: AggregationRequest,
    pub detail_count: usize,
    pub detail_revenue: f64,
    pub analysis: CubeAnalysis,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DrillStep {
    pub transition: Transition,
    /// Re-run analysis; `None` when the transition was a no-op.
    pub view: Option<LevelView>,
}

/// A navigator bound to an analyzer; every move re-runs the cube query.
pub struct DrillSession<'a> {
    navigator: DrillNavigator,
    analyzer: &'a OlapAnalyzer,
}

impl<'a> DrillSession<'a> {
    pub fn new(analyzer: &'a OlapAnalyzer, navigator: DrillNavigator) -> Self {
        Self {
            navigator,
            analyzer,
        }
    }

    pub fn navigator(&self) -> &DrillNavigator {
        &self.navigator
    }

    pub fn current_request(&self) -> AggregationRequest {
        self.navigator.current_request()
    }

    pub async fn drill_down(&mut self, dimension: Dimension) -> Result<DrillStep> {
        let transition = self.navigator.drill_down(dimension);
        self.step(transition).await
    }

    pub async fn roll_up(&mut self, dimension: Dimension) -> Result<DrillStep> {
        let transition = self.navigator.roll_up(dimension);
        self.step(transition).await
    }

    async fn step(&self, transition: Transition) -> Result<DrillStep> {
        if !transition.moved() {
            tracing::info!(%transition, "navigation unchanged");
            return Ok(DrillStep {
                transition,
                view: None,
            });
        }
        let view = self.render_current_level().await?;
        Ok(DrillStep {
            transition,
            view: Some(view),
        })
    }

    pub async fn render_current_level(&self) -> Result<LevelView> {
        let request = self.navigator.current_request();
        let analysis = self.analyzer.run_cube_analysis(&request).await?;
        let details: Vec<_> = analysis
            .rows_at(AggregationLevel::Detail)
            .cloned()
            .collect();
        let detail_revenue = details.iter().map(|r| r.total_revenue).sum();

        let mut text = String::new();
        let _ = write!(
            text,
            "Current analysis: {} x {} x {}",
            request.geo, request.time, request.product
        );
        match request.year {
            Some(year) => {
                let _ = writeln!(text, " ({year})");
            }
            None => text.push('\n'),
        }
        if details.is_empty() {
            let _ = writeln!(text, "{NO_DATA}");
        } else {
            let _ = writeln!(
                text,
                "Summary: {} records, total revenue: {}",
                details.len(),
                group_thousands(detail_revenue, 2)
            );
            let sample = self.analyzer.renderer().display().sample_rows;
            let _ = writeln!(text, "Sample data (top {sample} records):");
            text.push_str(&self.analyzer.renderer().rows(&details, sample));
        }

        Ok(LevelView {
            request,
            detail_count: details.len(),
            detail_revenue,
            analysis,
            text,
        })
    }
}
