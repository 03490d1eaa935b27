//! Weather command handler.

use std::fmt::Write as _;
use std::time::Duration;

use tabled::Tabled;

use hvaclink_core::{HvacSession, WeatherReport};

use crate::cli::{GlobalOpts, OutputFormat, WeatherArgs};
use crate::error::CliError;
use crate::output;

/// Reports carry Kelvin.
const KELVIN_OFFSET: f64 = 273.15;

#[derive(Tabled)]
struct WeatherRow {
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Conditions")]
    conditions: String,
    #[tabled(rename = "Temp")]
    temp: String,
    #[tabled(rename = "Humidity")]
    humidity: String,
    #[tabled(rename = "Wind")]
    wind: String,
}

fn celsius(kelvin: f64) -> String {
    format!("{:.1} °C", kelvin - KELVIN_OFFSET)
}

fn location(r: &WeatherReport) -> String {
    r.name.clone().unwrap_or_else(|| {
        r.coord
            .map_or_else(|| "-".into(), |c| format!("{:.2}, {:.2}", c.lat, c.lon))
    })
}

fn conditions(r: &WeatherReport) -> String {
    let parts: Vec<&str> = r.weather.iter().map(|w| w.description.as_str()).collect();
    if parts.is_empty() {
        "-".into()
    } else {
        parts.join(", ")
    }
}

fn weather_row(r: &WeatherReport) -> WeatherRow {
    WeatherRow {
        location: location(r),
        conditions: conditions(r),
        temp: celsius(r.main.temp),
        humidity: r
            .main
            .humidity
            .map_or_else(|| "-".into(), |h| format!("{h:.0}%")),
        wind: r
            .wind
            .and_then(|w| w.speed)
            .map_or_else(|| "-".into(), |s| format!("{s:.1} m/s")),
    }
}

fn detail(reports: &[WeatherReport]) -> String {
    let mut out = String::new();
    for r in reports {
        let _ = writeln!(out, "{}", location(r));
        let _ = writeln!(out, "  Conditions:  {}", conditions(r));
        let _ = writeln!(out, "  Temperature: {}", celsius(r.main.temp));
        if let Some(feels) = r.main.feels_like {
            let _ = writeln!(out, "  Feels like:  {}", celsius(feels));
        }
        let row = weather_row(r);
        let _ = writeln!(out, "  Humidity:    {}", row.humidity);
        let _ = writeln!(out, "  Wind:        {}", row.wind);
        if let Some(at) = chrono::DateTime::from_timestamp(r.dt, 0) {
            let _ = writeln!(out, "  Observed:    {}", at.format("%Y-%m-%d %H:%M UTC"));
        }
    }
    out.trim_end().to_string()
}

pub async fn handle(
    session: &HvacSession,
    args: WeatherArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if session.config().weather_url.is_none() {
        return Err(CliError::NotConfigured {
            feature: "Weather channel".into(),
            help: "Pass --weather-url, set HVACLINK_WEATHER_URL, \
                   or add weather_url to your profile."
                .into(),
        });
    }

    let mut reports = session.weather().subscribe();
    session.start()?;

    let wait = Duration::from_secs(args.wait);
    let received = tokio::time::timeout(wait, async {
        loop {
            if !reports.borrow_and_update().is_empty() {
                return true;
            }
            if reports.changed().await.is_err() {
                return false;
            }
        }
    })
    .await;

    match received {
        Ok(true) => {}
        Ok(false) => return Err(CliError::Internal("weather store closed".into())),
        Err(_) => {
            return Err(CliError::Timeout {
                what: "a weather report".into(),
                seconds: args.wait,
            });
        }
    }

    let reports = session.weather().reports();
    let out = if matches!(global.output, OutputFormat::Table) && reports.len() == 1 {
        detail(&reports)
    } else {
        output::render_list(&global.output, reports.as_slice(), weather_row, location)?
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
