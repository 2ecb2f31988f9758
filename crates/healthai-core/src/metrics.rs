/// Body-mass index from kilograms and centimetres.
pub fn bmi(weight_kg: f64, height_cm: f64) -> f64 {
    let height_m = height_cm / 100.0;
    weight_kg / (height_m * height_m)
}

/// Position of a BMI value on the dashboard's 15-40 gauge, clamped to 0..=1.
pub fn bmi_gauge(bmi: f64) -> f64 {
    ((bmi - 15.0) / (40.0 - 15.0)).clamp(0.0, 1.0)
}

pub fn bmi_category(bmi: f64) -> &'static str {
    match bmi {
        b if b < 18.5 => "Underweight",
        b if b < 25.0 => "Healthy",
        b if b < 30.0 => "Overweight",
        _ => "Obese",
    }
}
