use std::fmt::Write as _;

/// Results collected for one `seqn test` run, rendered as TAP version 14.
#[derive(Default)]
pub struct Tap {
    points: Vec<Point>,
}

struct Point {
    ok: bool,
    name: String,
    diagnostics: Vec<String>,
}

impl Tap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(&mut self, name: impl Into<String>) {
        self.points.push(Point {
            ok: true,
            name: name.into(),
            diagnostics: Vec::new(),
        });
    }

    pub fn not_ok(&mut self, name: impl Into<String>, diagnostics: impl Into<String>) {
        self.points.push(Point {
            ok: false,
            name: name.into(),
            diagnostics: diagnostics.into().lines().map(str::to_owned).collect(),
        });
    }

    /// Record a check: `Ok(())` passes, `Err(why)` fails with `why` as diagnostics.
    pub fn check(&mut self, name: impl Into<String>, result: Result<(), String>) {
        match result {
            Ok(()) => self.ok(name),
            Err(why) => self.not_ok(name, why),
        }
    }

    pub fn failure_count(&self) -> usize {
        self.points.iter().filter(|p| !p.ok).count()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "TAP version 14");
        let _ = writeln!(out, "1..{}", self.points.len());
        for (i, p) in self.points.iter().enumerate() {
            let status = if p.ok { "ok" } else { "not ok" };
            let _ = writeln!(out, "{} {} - {}", status, i + 1, p.name);
            for line in &p.diagnostics {
                let _ = writeln!(out, "  # {}", line);
            }
        }
        let failed = self.failure_count();
        let _ = writeln!(out, "# tests {}", self.points.len());
        let _ = writeln!(out, "# pass  {}", self.points.len() - failed);
        let _ = writeln!(out, "# fail  {}", failed);
        out
    }

    /// Print the report to stdout.
    pub fn finish(self) {
        print!("{}", self.render());
    }
}
