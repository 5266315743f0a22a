// tests/round_trip.rs
//! Printing a parsed shader and parsing the output again yields a
//! structurally equal unit, and printing is a fixed point.

use shade_frontend::{parse, print};

const SHADERS: &[&str] = &[
    "void main() {}",
    r#"#version 310 es
precision highp float;
precision highp int;

layout(location = 0) out vec4 _GLF_color;
uniform vec2 injectionSwitch;
uniform float time;

struct _GLF_struct_1 {
    float x;
    int y;
};

struct S {
    _GLF_struct_1 _f0;
    vec3 pos;
};

float helper(float a, inout int b);

float helper(float a, inout int b) {
    b += int(a) << 2;
    return a > 0.5 ? a * (a - 1.0) : -(-a);
}

void main() {
    S s = S(_GLF_struct_1(1.0, 2), vec3(0.0));
    vec3 arr[2];
    int i = 0, j;
    for (int k = 0; k < 4; k++) {
        if (injectionSwitch.x > injectionSwitch.y) {
            discard;
        }
        i = i + k * 2 - (k - 1);
    }
    while (i > 0) i--;
    do {
        j = (i, 3);
    } while (false);
    _GLF_color = vec4(helper(s._f0.x, i), arr[1].xy + s.pos.xy, float(j));
}
"#,
    r#"#version 100
#ifdef GL_ES
#endif
varying lowp vec2 uv;
const float k = 1.0 / 3.0;
bool flag = !(k < 0.0) ^^ true;
void main(void) {
    mat2 m = mat2(1.0);
    gl_FragColor = vec4(m[0] * ~1 == 0 ? uv : uv.yx, 0.0, 1.0);
}
"#,
];

#[test]
fn parse_print_parse_is_structurally_equal() {
    for source in SHADERS {
        let tu = parse(source).unwrap_or_else(|e| panic!("parse failed: {e}\n{source}"));
        let printed = print(&tu);
        let reparsed =
            parse(&printed).unwrap_or_else(|e| panic!("reparse failed: {e}\n{printed}"));
        assert!(tu.structural_eq(&reparsed), "round trip changed:\n{printed}");
    }
}

#[test]
fn printing_is_idempotent() {
    for source in SHADERS {
        let once = print(&parse(source).unwrap());
        let twice = print(&parse(&once).unwrap());
        assert_eq!(once, twice);
    }
}

#[test]
fn compacted_unit_prints_identically() {
    for source in SHADERS {
        let tu = parse(source).unwrap();
        assert_eq!(print(&tu), print(&tu.compact()));
    }
}
