use anyhow::{Result, bail};
use serde::Serialize;
use tracing::info;

use crate::cli::{ChartArgs, ChartSeries};
use crate::model::{CiteSource, CvData};
use crate::plot::{self, OptimumOrdinate};
use crate::util::write_json_pretty;

/// Chart-ready data: year labels, one or more bar series, and the
/// derived ordinate axis. Rendering is left to whatever consumes the
/// JSON.
#[derive(Debug, Serialize)]
struct ChartData {
    series: &'static str,
    years: Vec<i32>,
    axis: OptimumOrdinate,
    bars: Vec<BarSeries>,
}

#[derive(Debug, Serialize)]
struct BarSeries {
    label: &'static str,
    values: Vec<f64>,
}

pub fn run(args: ChartArgs) -> Result<()> {
    let data = super::load_resolved(&args.records, args.post_appointment, args.post_tenure)?;

    let chart = match args.series {
        ChartSeries::Publications => publications_chart(&data, &args)?,
        ChartSeries::Citations => citations_chart(&data, &args)?,
        ChartSeries::Funding => funding_chart(&data, &args)?,
    };

    info!(
        series = chart.series,
        first_year = chart.years.first().copied().unwrap_or_default(),
        last_year = chart.years.last().copied().unwrap_or_default(),
        max_ordinate = chart.axis.max_ordinate,
        delta = chart.axis.delta,
        "built chart data"
    );

    match args.out {
        Some(ref out) => {
            write_json_pretty(out, &chart)?;
            info!(path = %out.display(), "wrote chart data");
        }
        None => println!("{}", serde_json::to_string_pretty(&chart)?),
    }

    Ok(())
}

fn publications_chart(data: &CvData, args: &ChartArgs) -> Result<ChartData> {
    let Some(series) = plot::publications_per_year(data) else {
        bail!("no peer-reviewed publications to chart");
    };

    // The bars stack, so the axis must cover the per-year sums.
    let stacked: Vec<u64> = series
        .published
        .iter()
        .zip(&series.pending)
        .map(|(published, pending)| u64::from(published + pending))
        .collect();
    let axis = OptimumOrdinate::new(&stacked, args.delta, args.max_ticks);

    Ok(ChartData {
        series: "publications",
        years: series.span.years().collect(),
        axis,
        bars: vec![
            BarSeries {
                label: "published",
                values: as_f64(&series.published),
            },
            BarSeries {
                label: "pending",
                values: as_f64(&series.pending),
            },
        ],
    })
}

fn citations_chart(data: &CvData, args: &ChartArgs) -> Result<ChartData> {
    let mut sources = vec![CiteSource::Scopus];
    if args.with_wos {
        sources.push(CiteSource::WebOfScience);
    }
    if args.with_google {
        sources.push(CiteSource::GoogleScholar);
    }

    let Some(span) = plot::citation_span(data, &sources) else {
        bail!("no peer-reviewed publications to chart");
    };

    let mut bars = Vec::with_capacity(sources.len());
    let mut peaks = Vec::new();
    for source in sources {
        let counts = plot::citations_per_year(data, source, span);
        peaks.extend(counts.iter().map(|&count| u64::from(count)));
        bars.push(BarSeries {
            label: source.as_str(),
            values: as_f64(&counts),
        });
    }
    let axis = OptimumOrdinate::new(&peaks, args.delta, args.max_ticks);

    Ok(ChartData {
        series: "citations",
        years: span.years().collect(),
        axis,
        bars,
    })
}

fn funding_chart(data: &CvData, args: &ChartArgs) -> Result<ChartData> {
    let Some(series) = plot::funding_per_year(&data.grants)? else {
        bail!("no awarded grants to chart");
    };

    let stacked: Vec<u64> = series
        .total()
        .iter()
        .map(|&amount| amount.ceil() as u64)
        .collect();
    let axis = OptimumOrdinate::new(&stacked, args.delta, args.max_ticks);

    Ok(ChartData {
        series: "funding",
        years: series.span.years().collect(),
        axis,
        bars: vec![
            BarSeries {
                label: "external",
                values: series.external.clone(),
            },
            BarSeries {
                label: "internal",
                values: series.internal.clone(),
            },
        ],
    })
}

fn as_f64(values: &[u32]) -> Vec<f64> {
    values.iter().map(|&value| f64::from(value)).collect()
}
