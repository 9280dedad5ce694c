//! Visualization Worker
//!
//! Renders a chart from two columns of the working dataset and returns it as
//! a base64 SVG data URI.

use async_trait::async_trait;
use base64::Engine as _;
use serde_json::json;
use tracing::info;

use super::chart::{self, ChartData, ChartKind, ChartSpec};
use crate::config::VisualizationConfig;
use sdk::errors::CapabilityError;
use sdk::{Artifact, Capability, CapabilityDescriptor, ContextSlot, Dataset, Invocation, StepParams};

pub const NAME: &str = "VisualizationAgent";

const MIME_TYPE: &str = "image/svg+xml";

pub struct VisualizationWorker {
    descriptor: CapabilityDescriptor,
    width: u32,
    height: u32,
}

impl VisualizationWorker {
    pub fn new(config: &VisualizationConfig) -> Self {
        let descriptor = CapabilityDescriptor::new(
            NAME,
            "Creates a plot or chart (scatter, line or bar) from a data table.",
        )
        .requires_param("x_column")
        .requires_param("y_column")
        .reads(ContextSlot::Dataset)
        .writes(ContextSlot::Chart)
        .caller_visible()
        .example(json!({
            "agent": NAME,
            "goal": "Plot Rank vs. Peak with a dotted red regression line.",
            "params": {
                "plot_type": "scatter",
                "x_column": "Rank",
                "y_column": "Peak",
                "regression_line": true
            }
        }));

        Self {
            descriptor,
            width: config.width,
            height: config.height,
        }
    }

    /// Render a chart described by `params` from `dataset`
    pub fn plot(&self, dataset: &Dataset, params: &StepParams) -> Result<Artifact, CapabilityError> {
        let kind: ChartKind = params
            .param_str_opt("plot_type")
            .unwrap_or_else(|| "scatter".to_string())
            .parse()?;
        let x_column = params.param_str("x_column")?;
        let y_column = params.param_str("y_column")?;

        let missing: Vec<String> = [&x_column, &y_column]
            .into_iter()
            .filter(|c| dataset.column_index(c).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(CapabilityError::InvalidColumns(missing));
        }

        let data = chart_data(dataset, kind, &x_column, &y_column)?;
        let spec = ChartSpec {
            kind,
            title: params
                .param_str_opt("title")
                .unwrap_or_else(|| format!("Plot of {} vs. {}", y_column, x_column)),
            x_label: x_column,
            y_label: y_column,
            regression_line: kind.is_numeric()
                && params.param_bool_opt("regression_line").unwrap_or(false),
            width: self.width,
            height: self.height,
        };

        let svg = chart::render_svg(&spec, &data);
        let encoded = base64::engine::general_purpose::STANDARD.encode(svg.as_bytes());
        info!(
            "Rendered {:?} chart with {} data point(s), {} bytes encoded",
            kind,
            data.len(),
            encoded.len()
        );

        Ok(Artifact::Image {
            mime_type: MIME_TYPE.to_string(),
            data_uri: format!("data:{};base64,{}", MIME_TYPE, encoded),
        })
    }
}

#[async_trait]
impl Capability for VisualizationWorker {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, invocation: Invocation<'_>) -> Result<Artifact, CapabilityError> {
        let dataset = invocation.dataset(ContextSlot::Dataset)?;
        self.plot(dataset, invocation.params())
    }
}

/// Pair up the two columns, skipping rows that cannot be plotted
fn chart_data(
    dataset: &Dataset,
    kind: ChartKind,
    x_column: &str,
    y_column: &str,
) -> Result<ChartData, CapabilityError> {
    let (Some(xs), Some(ys)) = (
        dataset.column_values(x_column),
        dataset.column_values(y_column),
    ) else {
        return Err(CapabilityError::InvalidColumns(vec![
            x_column.to_string(),
            y_column.to_string(),
        ]));
    };
    let pairs = xs.zip(ys);

    let data = if kind.is_numeric() {
        ChartData::Points(
            pairs
                .filter_map(|(x, y)| Some((x.as_f64()?, y.as_f64()?)))
                .collect(),
        )
    } else {
        ChartData::Bars(
            pairs
                .filter(|(x, _)| !x.is_null())
                .filter_map(|(x, y)| Some((x.to_string(), y.as_f64()?)))
                .collect(),
        )
    };

    if data.is_empty() {
        return Err(CapabilityError::InvalidParameter(format!(
            "no plottable values in columns '{}' and '{}'",
            x_column, y_column
        )));
    }
    Ok(data)
}
