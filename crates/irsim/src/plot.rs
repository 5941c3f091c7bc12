//! SVG line plots of the normalized spectra of one molecule

use std::fmt::Write;

use irspec::Spectrum;

const WIDTH: f64 = 1800.0;
const HEIGHT: f64 = 800.0;
const LEFT: f64 = 80.0;
const RIGHT: f64 = 40.0;
const TOP: f64 = 70.0;
const BOTTOM: f64 = 90.0;
const FONT_SIZE: usize = 18;

/// line colors, cycled through in order
const COLORS: [&str; 8] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b",
    "#e377c2", "#7f7f7f",
];

/// the spacing in cm⁻¹ between labeled ticks on the frequency axis
const TICK: f64 = 500.0;

pub struct Plot<'a> {
    title: &'a str,
    spectra: &'a [Spectrum],
}

fn escape(s: &str) -> String {
    let mut ret = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => ret.push_str("&amp;"),
            '<' => ret.push_str("&lt;"),
            '>' => ret.push_str("&gt;"),
            '"' => ret.push_str("&quot;"),
            c => ret.push(c),
        }
    }
    ret
}

impl<'a> Plot<'a> {
    pub fn new(title: &'a str, spectra: &'a [Spectrum]) -> Self {
        Self { title, spectra }
    }

    /// the frequency range covered by any of the spectra
    fn x_range(&self) -> (f64, f64) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for s in self.spectra {
            let f = s.freqs();
            lo = lo.min(f[0]);
            hi = hi.max(f[f.len() - 1]);
        }
        if lo < hi { (lo, hi) } else { (0.0, 1.0) }
    }

    /// zero up to the largest intensity, or to one for flat spectra. the
    /// intensity axis is unlabeled, so only the shapes matter
    fn y_range(&self) -> (f64, f64) {
        let mut lo: f64 = 0.0;
        let mut hi: f64 = 0.0;
        for s in self.spectra {
            for &y in s.intensities() {
                if y.is_finite() {
                    lo = lo.min(y);
                    hi = hi.max(y);
                }
            }
        }
        if hi > lo { (lo, hi) } else { (lo, lo + 1.0) }
    }

    pub fn to_svg(&self) -> String {
        let (x0, x1) = self.x_range();
        let (y0, y1) = self.y_range();
        let pw = WIDTH - LEFT - RIGHT;
        let ph = HEIGHT - TOP - BOTTOM;
        let sx = |x: f64| LEFT + (x - x0) / (x1 - x0) * pw;
        let sy = |y: f64| TOP + ph - (y - y0) / (y1 - y0) * ph;

        let mut out = String::new();
        // writing to a String cannot fail
        let _ = self.write_svg(&mut out, (x0, x1), sx, sy);
        out
    }

    fn write_svg(
        &self,
        w: &mut String,
        (x0, x1): (f64, f64),
        sx: impl Fn(f64) -> f64,
        sy: impl Fn(f64) -> f64,
    ) -> std::fmt::Result {
        let bottom = HEIGHT - BOTTOM;
        writeln!(
            w,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif" font-size="{FONT_SIZE}">"#
        )?;
        writeln!(
            w,
            r#"<rect width="{WIDTH}" height="{HEIGHT}" fill="white"/>"#
        )?;
        writeln!(
            w,
            r#"<text x="{}" y="{}" text-anchor="middle">{}</text>"#,
            WIDTH / 2.0,
            TOP / 2.0,
            escape(self.title)
        )?;

        // frequency axis
        writeln!(
            w,
            r#"<line x1="{LEFT}" y1="{bottom}" x2="{}" y2="{bottom}" stroke="black"/>"#,
            WIDTH - RIGHT
        )?;
        let mut tick = (x0 / TICK).ceil() * TICK;
        while tick <= x1 {
            let x = sx(tick);
            writeln!(
                w,
                r#"<line x1="{x:.2}" y1="{bottom}" x2="{x:.2}" y2="{}" stroke="black"/>"#,
                bottom + 8.0
            )?;
            writeln!(
                w,
                r#"<text x="{x:.2}" y="{}" text-anchor="middle">{tick}</text>"#,
                bottom + 30.0
            )?;
            tick += TICK;
        }
        writeln!(
            w,
            r#"<text x="{}" y="{}" text-anchor="middle">Frequency (cm⁻¹)</text>"#,
            LEFT + (WIDTH - LEFT - RIGHT) / 2.0,
            HEIGHT - 25.0
        )?;
        writeln!(
            w,
            r#"<text x="30" y="{y}" text-anchor="middle" transform="rotate(-90 30 {y})">IR intensity</text>"#,
            y = TOP + (HEIGHT - TOP - BOTTOM) / 2.0
        )?;

        for (i, s) in self.spectra.iter().enumerate() {
            let color = COLORS[i % COLORS.len()];
            write!(
                w,
                r#"<polyline fill="none" stroke="{color}" stroke-width="2" points=""#
            )?;
            let points = s.freqs().iter().zip(s.intensities());
            for (k, (&f, &y)) in points.enumerate() {
                if !y.is_finite() {
                    continue;
                }
                if k > 0 {
                    w.push(' ');
                }
                write!(w, "{:.2},{:.2}", sx(f), sy(y))?;
            }
            writeln!(w, r#""/>"#)?;

            // legend in the upper right
            let ly = TOP + 10.0 + 28.0 * i as f64;
            let lx = WIDTH - RIGHT - 220.0;
            writeln!(
                w,
                r#"<line x1="{lx}" y1="{ly}" x2="{}" y2="{ly}" stroke="{color}" stroke-width="3"/>"#,
                lx + 40.0
            )?;
            writeln!(
                w,
                r#"<text x="{}" y="{}">{}</text>"#,
                lx + 50.0,
                ly + 6.0,
                escape(s.label())
            )?;
        }
        writeln!(w, "</svg>")
    }
}
