/// Default base temperature for growing degree days (°C)
pub const DEFAULT_BASE_TEMPERATURE: f64 = 10.0;

/// Growing degree days for one day: `max((t_min + t_max) / 2 − base, 0)`
pub fn growing_degree_days(t_min: f64, t_max: f64, base_temperature: f64) -> f64 {
    let avg = (t_min + t_max) / 2.0;
    (avg - base_temperature).max(0.0)
}

/// Season total over daily (t_min, t_max) pairs
pub fn accumulated_gdd(daily_temperatures: &[(f64, f64)], base_temperature: f64) -> f64 {
    daily_temperatures
        .iter()
        .map(|&(t_min, t_max)| growing_degree_days(t_min, t_max, base_temperature))
        .sum()
}
