use std::sync::Once;

pub(crate) trait TestHelper {
    fn assert_approx_eq<const N: usize>(&self, expected: [f64; N]);
}

impl TestHelper for [f64] {
    #[track_caller]
    fn assert_approx_eq<const N: usize>(&self, expected: [f64; N]) {
        assert_eq!(self.len(), N, "{self:?} vs {expected:?}");
        for (actual, expected) in self.iter().zip(expected) {
            assert!(
                (actual - expected).abs() < 1e-9,
                "{actual} is not approximately {expected}"
            );
        }
    }
}

/// Routes `log` output to stdout so fallback warnings show up under `--nocapture`.
pub(crate) fn init_logger() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "[{} {}] {}",
                    record.level(),
                    record.target(),
                    message
                ))
            })
            .level(log::LevelFilter::Debug)
            .chain(std::io::stdout())
            .apply();
    });
}
