//! HTML rendering of the dashboard page.
//!
//! The whole application is one page: the household form on top and, once
//! the form has been submitted, the analysis sections below it.

use maud::{html, Markup, PreEscaped, DOCTYPE};
use plotly::common::{Orientation, TextPosition};
use plotly::layout::{Axis, Margin};
use plotly::{Bar, Layout, Plot};

use crate::models::{AnalysisReport, Dwelling, FeatureImpact, HouseholdInput, Region};

const TITLE: &str = "⚡ Intelligent Abnormal Electricity Usage Detection";
const PLOTLY_JS: &str = "https://cdn.plot.ly/plotly-2.12.1.min.js";

/// What to show below the form.
#[derive(Clone, Copy)]
pub enum PageState<'a> {
    Form,
    Report(&'a AnalysisReport),
    Error(&'a str),
}

/// Horizontal bar chart of the impact percentages, largest on top.
pub fn impact_chart(impacts: &[FeatureImpact]) -> Plot {
    // plotly draws the first category at the bottom
    let ordered: Vec<&FeatureImpact> = impacts.iter().rev().collect();
    let x: Vec<f64> = ordered.iter().map(|i| i.percent).collect();
    let y: Vec<String> = ordered.iter().map(|i| i.name.clone()).collect();
    let text: Vec<String> = x.iter().map(|v| format!("{:.1}%", v)).collect();

    let trace = Bar::new(x, y)
        .orientation(Orientation::Horizontal)
        .text_array(text)
        .text_position(TextPosition::Outside);

    let layout = Layout::new()
        .height(380)
        .margin(Margin::new().left(160).right(40).top(30).bottom(30))
        .x_axis(Axis::new().title("Impact on Prediction (%)"));

    let mut plot = Plot::new();
    plot.add_trace(trace);
    plot.set_layout(layout);
    plot
}

pub fn render_page(input: &HouseholdInput, state: PageState<'_>) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (TITLE) }
                link rel="stylesheet" href="/static/dashboard.css";
                script src=(PLOTLY_JS) {}
            }
            body {
                h1.center { (TITLE) }
                p.center {
                    "Machine Learning system for detecting abnormal residential electricity consumption"
                }
                hr;
                @if let PageState::Error(message) = state {
                    div.alert.error { (message) }
                }
                (household_form(input))
                @if let PageState::Report(report) = state {
                    (report_sections(report))
                }
            }
        }
    }
}

fn number_field(label: &str, name: &str, value: String, min: &str, max: &str, step: &str) -> Markup {
    html! {
        label for=(name) { (label) }
        input type="number" id=(name) name=(name) value=(value) min=(min) max=(max) step=(step) required;
    }
}

fn household_form(input: &HouseholdInput) -> Markup {
    html! {
        h3 { "🏠 Household Input Parameters" }
        form method="post" action="/analyze" {
            div.columns {
                div.column {
                    label for="region" { "📍 Region" }
                    select id="region" name="region" {
                        @for region in Region::ALL {
                            option value=(region.as_str()) selected[region == input.region] {
                                (region.as_str())
                            }
                        }
                    }
                    label for="dwelling" { "🏢 Dwelling Type" }
                    select id="dwelling" name="dwelling" {
                        @for dwelling in Dwelling::ALL {
                            option value=(dwelling.as_str()) selected[dwelling == input.dwelling] {
                                (dwelling.as_str())
                            }
                        }
                    }
                    (number_field("👨‍👩‍👧 Number of Occupants", "occupants", input.occupants.to_string(), "1", "10", "1"))
                }
                div.column {
                    (number_field("🏠 House Area (sqft)", "house_area", input.house_area.to_string(), "300", "5000", "1"))
                    (number_field("🔌 Appliance Score", "appliance_score", input.appliance_score.to_string(), "1", "30", "1"))
                    (number_field("⚡ Connected Load (kW)", "connected_load", input.connected_load.to_string(), "1.0", "20.0", "any"))
                }
                div.column {
                    (number_field("🌡 Temperature (°C)", "temperature", input.temperature.to_string(), "10.0", "50.0", "any"))
                    (number_field("💧 Humidity (%)", "humidity", input.humidity.to_string(), "20.0", "100.0", "any"))
                    (number_field("📉 Usage Deviation (kWh)", "deviation_abs", input.deviation_abs.to_string(), "0.0", "50.0", "any"))
                }
            }
            hr;
            div.center {
                button type="submit" { "🔍 Analyze Usage Risk" }
            }
        }
    }
}

fn report_sections(report: &AnalysisReport) -> Markup {
    let chart = impact_chart(&report.impacts).to_inline_html(Some("impact-chart"));

    html! {
        hr;
        h3 { "📄 Prediction Result" }
        @if report.abnormal {
            div.alert.error { (report.label()) }
        } @else {
            div.alert.success { (report.label()) }
        }

        h2.center { "📊 Prediction Confidence" }
        p.center {
            b { "Normal:" } " " (format!("{:.1}%", report.normal_probability))
            (PreEscaped("&nbsp;&nbsp;&nbsp;"))
            b { "Abnormal:" } " " (format!("{:.1}%", report.abnormal_probability))
        }

        hr;
        h2.center { "⚠️ Risk Explanation" }
        @if !report.abnormal {
            div.alert.success { "✅ Electricity usage is within normal operating limits" }
        }
        @for reason in &report.reasons {
            p.center { "• " (reason) }
        }

        hr;
        h2.center { "🎯 What Influenced Your Result" }
        p.caption {
            "These factors show which inputs most influenced the prediction. "
            "Higher percentage means stronger influence."
        }
        div.chart { (PreEscaped(chart)) }

        hr;
        h2.center { "🛠 Recommended Actions" }
        div.center {
            ul.actions {
                @for action in &report.actions {
                    li { (action) }
                }
            }
        }
        p.caption { "Analyzed at " (report.timestamp) }
    }
}

/// Minimal page for errors outside the dashboard flow.
pub fn render_error(status: &str, message: &str) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { (status) }
                link rel="stylesheet" href="/static/dashboard.css";
            }
            body {
                h1.center { (status) }
                div.alert.error { (message) }
                p.center { a href="/" { "Back to the dashboard" } }
            }
        }
    }
}
