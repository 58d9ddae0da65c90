use lector_color::{brightness, brightness_of, parse_color, to_color_string};

const TOLERANCE: f32 = 0.02;

fn assert_close(actual: f32, expected: f32, what: &str) {
    assert!(
        (actual - expected).abs() < TOLERANCE,
        "{what}: expected {expected}, got {actual}"
    );
}

#[test]
fn parses_functional_and_hex_notations() {
    let gray = parse_color("rgb(128, 128, 128)").expect("rgb() should parse");
    assert_close(gray.saturation, 0.0, "gray saturation");
    assert_close(gray.lightness, 0.5, "gray lightness");
    assert_close(gray.alpha, 1.0, "gray alpha");

    let red = parse_color("#ff0000").expect("hex should parse");
    assert_close(red.hue, 0.0, "red hue");
    assert_close(red.saturation, 1.0, "red saturation");
    assert_close(red.lightness, 0.5, "red lightness");

    let hsl = parse_color("hsl(120, 50%, 20%)").expect("hsl() should parse");
    assert_close(hsl.hue, 120.0, "hsl hue");
    assert_close(hsl.saturation, 0.5, "hsl saturation");
    assert_close(hsl.lightness, 0.2, "hsl lightness");

    let translucent = parse_color("rgba(0, 0, 0, 0.5)").expect("rgba() should parse");
    assert_close(translucent.alpha, 0.5, "rgba alpha");
}

#[test]
fn parses_named_colors() {
    let white = parse_color("white").expect("named white should parse");
    assert_close(white.lightness, 1.0, "white lightness");

    assert!(parse_color("rebeccapurple").is_some());
}

#[test]
fn cascade_keywords_are_not_colors() {
    for keyword in ["inherit", "transparent", "initial", "currentcolor", "none", "unset"] {
        assert!(parse_color(keyword).is_none(), "{keyword} should not parse");
    }
    // Keyword matching is case-insensitive, as in CSS.
    assert!(parse_color("currentColor").is_none());
    assert!(parse_color("  Inherit  ").is_none());
}

#[test]
fn malformed_strings_never_parse_and_never_panic() {
    for input in ["", "rgb(", "#zzz", "hsl(12", "10px solid red", "url(bg.png)"] {
        assert!(parse_color(input).is_none(), "{input:?} should not parse");
    }
}

#[test]
fn variable_references_are_stripped_before_parsing() {
    // A bare reference leaves nothing to parse.
    assert!(parse_color("var(--accent)").is_none());

    // Stripping the reference can expose a parsable remainder.
    let recovered = parse_color("var(--ignored) #336699").expect("remainder should parse");
    assert_close(recovered.hue, 210.0, "recovered hue");

    // ... but the remainder may also still be malformed.
    assert!(parse_color("rgb(59 130 246 / var(--opacity))").is_none());
    assert!(parse_color("var(--unterminated").is_none());
}

#[test]
fn brightness_is_perceptual_and_bounded() {
    let white = brightness_of("white").expect("white brightness");
    let black = brightness_of("black").expect("black brightness");
    let green = brightness_of("rgb(0, 255, 0)").expect("green brightness");
    let blue = brightness_of("rgb(0, 0, 255)").expect("blue brightness");

    assert_close(white, 1.0, "white brightness");
    assert_close(black, 0.0, "black brightness");
    // Green reads brighter than blue at equal channel intensity.
    assert!(green > blue);
    for value in [white, black, green, blue] {
        assert!((0.0..=1.0).contains(&value));
    }

    assert!(brightness_of("var(--x)").is_none());
}

#[test]
fn rendering_round_trips_tracked_channels() {
    let samples = [
        "rgb(240, 241, 242)",
        "#112233",
        "hsl(340, 80%, 35%)",
        "rgba(20, 90, 50, 0.25)",
    ];
    for sample in samples {
        let first = parse_color(sample).expect("sample should parse");
        let rendered = to_color_string(&first);
        let second = parse_color(&rendered).expect("rendered string should parse");
        assert_close(second.saturation, first.saturation, "saturation round trip");
        assert_close(second.lightness, first.lightness, "lightness round trip");
        assert_close(second.alpha, first.alpha, "alpha round trip");
        if first.saturation > 0.05 {
            assert!(
                (second.hue - first.hue).abs() < 2.0,
                "hue round trip for {sample}: {} vs {}",
                first.hue,
                second.hue
            );
        }
        assert_close(brightness(&second), brightness(&first), "brightness round trip");
    }
}
