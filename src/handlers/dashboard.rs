//! Dashboard: per-resource row counts, grouped navigation, chart widgets.

use crate::auth::AdminUser;
use crate::dispatch::AdminResponse;
use crate::error::AdminError;
use crate::state::AdminContext;
use crate::view::{ChartWidget, DashboardView, Stat, ViewModel};
use std::collections::HashMap;

pub async fn render(ctx: &AdminContext, _user: &AdminUser) -> Result<AdminResponse, AdminError> {
    let mut stats = Vec::new();
    for resource in ctx.registry.resources() {
        let count = ctx.store.count(&resource.collection, &[]).await?;
        stats.push(Stat {
            label: resource.name.clone(),
            value: count,
        });
    }

    let mut charts = Vec::new();
    for (i, chart) in ctx.registry.charts().iter().enumerate() {
        let (labels, values) = chart.provider.data(ctx.store.as_ref()).await?;
        charts.push(ChartWidget {
            id: format!("chart-{}", i),
            label: chart.label.clone(),
            chart_type: chart.chart_type.clone(),
            labels,
            values,
        });
    }

    let nav: HashMap<String, Vec<String>> = ctx
        .registry
        .grouped_resources()
        .into_iter()
        .map(|(group, resources)| (group, resources.into_iter().map(|r| r.name.clone()).collect()))
        .collect();
    let pages: HashMap<String, Vec<String>> = ctx
        .registry
        .grouped_pages()
        .into_iter()
        .map(|(group, pages)| (group, pages.into_iter().map(|p| p.name.clone()).collect()))
        .collect();

    Ok(AdminResponse::View(ViewModel::Dashboard(DashboardView {
        site_title: ctx.registry.config.site_title.clone(),
        stats,
        charts,
        nav,
        pages,
    })))
}
