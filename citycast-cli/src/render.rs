use citycast_core::{City, Country, Forecast};

const UNKNOWN: &str = "unknown";

/// Hero block plus the five daily rows.
pub fn report(city: &City) -> String {
    let mut out = String::new();
    out.push_str(&city.display_name());
    if city.is_favourite {
        out.push_str(" ★");
    }
    out.push('\n');
    out.push_str(&current(&city.current_weather));

    for day in &city.five_day_forecast {
        out.push('\n');
        out.push_str(&daily(day));
    }
    out
}

fn current(now: &Forecast) -> String {
    if !now.has_data {
        return format!("  Now: {UNKNOWN}");
    }

    let mut lines = vec![
        format!(
            "  Now: {:.1}°C, feels like {:.1}°C, {}",
            now.temperature, now.feels_like, now.description
        ),
        format!("  Low {:.1}°C / High {:.1}°C, humidity {}%", now.min, now.max, now.humidity),
        wind(now),
    ];
    if let Some(url) = now.icon_url() {
        lines.push(format!("  Icon: {url}"));
    }
    lines.join("\n")
}

fn wind(reading: &Forecast) -> String {
    let mut line = format!("  Wind: {:.1} m/s {}", reading.wind, reading.compass_point());
    if reading.wind_gust > 0.0 {
        line.push_str(&format!(", gusts {:.1} m/s", reading.wind_gust));
    }
    line
}

fn daily(day: &Forecast) -> String {
    match day.date {
        Some(date) if day.has_data => format!(
            "  {}  {:>5.1}°C {:>5.1}°C  {}",
            date.format("%a %d %b"),
            day.min,
            day.max,
            day.description
        ),
        _ => format!("  {UNKNOWN}"),
    }
}

/// One line per saved city, as used by `citycast list`.
pub fn city_line(city: &City) -> String {
    let marker = if city.is_favourite { "★" } else { " " };
    format!("{marker} {} [{}]", city.display_name(), city.list_name)
}

pub fn country_line(country: &Country) -> String {
    format!("{:<3} {}", country.code, country.name)
}
