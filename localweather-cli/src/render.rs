use localweather_core::{OperationState, WeatherResult};

/// Upper-cases the first letter of every word, like `clear sky` → `Clear Sky`.
pub fn capitalize_words(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn clock_line(local_time: Option<&str>) -> String {
    format!("Local time  {}", local_time.unwrap_or("--:--:--"))
}

/// The weather card, one field per line.
pub fn card(result: &WeatherResult, local_time: Option<&str>, icon_base_url: &str) -> String {
    let mut out = String::new();

    out.push_str(&format!("{}, {}\n", result.location_name, result.country));
    out.push_str(&clock_line(local_time));
    out.push('\n');
    out.push('\n');
    out.push_str(&format!(
        "{:<12}{}\n",
        capitalize_words(&result.description),
        result.temperature_display()
    ));
    out.push_str(&format!("{:<12}{}\n", "Feels like", result.feels_like_display()));
    out.push_str(&format!("{:<12}{}\n", "Humidity", result.humidity_display()));
    out.push_str(&format!("{:<12}{}\n", "Wind", result.wind_display()));
    out.push_str(&format!("{:<12}{}\n", "Pressure", result.pressure_display()));
    out.push_str(&format!("{:<12}{}", "Icon", result.icon_url(icon_base_url)));

    out
}

/// Status line for states that have no card.
pub fn status(state: &OperationState) -> Option<String> {
    match state {
        OperationState::Loading => Some("Loading...".to_string()),
        OperationState::Failure(err) => Some(format!("Error: {err}")),
        OperationState::Idle | OperationState::Success(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use localweather_core::WeatherError;

    fn paris() -> WeatherResult {
        WeatherResult {
            location_name: "Paris".into(),
            country: "FR".into(),
            description: "clear sky".into(),
            icon: "01d".into(),
            temperature_c: 18.4,
            feels_like_c: 17.9,
            humidity_pct: 40,
            wind_speed_mps: 3.1,
            pressure_hpa: 1012.0,
            timezone: 7200,
        }
    }

    #[test]
    fn capitalizes_each_word() {
        assert_eq!(capitalize_words("clear sky"), "Clear Sky");
        assert_eq!(capitalize_words("light  rain"), "Light  Rain");
        assert_eq!(capitalize_words(""), "");
    }

    #[test]
    fn card_shows_rounded_values_and_icon() {
        let text = card(&paris(), Some("12:00:00 PM"), "https://openweathermap.org/img/wn");

        assert!(text.starts_with("Paris, FR\nLocal time  12:00:00 PM\n"));
        assert!(text.contains("Clear Sky   18°C"));
        assert!(text.contains("Humidity    40%"));
        assert!(text.contains("Wind        3 m/s"));
        assert!(text.contains("Pressure    1012 hPa"));
        assert!(text.ends_with("https://openweathermap.org/img/wn/01d@2x.png"));
    }

    #[test]
    fn clock_placeholder_before_first_tick() {
        assert_eq!(clock_line(None), "Local time  --:--:--");
    }

    #[test]
    fn failure_and_loading_states() {
        assert_eq!(status(&OperationState::Loading).as_deref(), Some("Loading..."));
        assert_eq!(
            status(&OperationState::Failure(WeatherError::EmptyInput)).as_deref(),
            Some("Error: Please enter a city name")
        );
        assert_eq!(status(&OperationState::Idle), None);
        assert_eq!(status(&OperationState::Success(paris())), None);
    }
}
