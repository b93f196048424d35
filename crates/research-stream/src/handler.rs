//! Receivers for stream events

/// Callbacks driven by the consumer
///
/// `on_done` fires at most once. After a read error it fires only if some
/// text already reached `on_delta`.
pub trait StreamHandler {
    fn on_delta(&mut self, text: &str);
    fn on_done(&mut self);
    fn on_error(&mut self, message: &str);
}

/// Handler built from three closures
pub struct Callbacks<D, F, E> {
    on_delta: D,
    on_done: F,
    on_error: E,
}

impl<D, F, E> Callbacks<D, F, E>
where
    D: FnMut(&str),
    F: FnMut(),
    E: FnMut(&str),
{
    pub fn new(on_delta: D, on_done: F, on_error: E) -> Self {
        Self {
            on_delta,
            on_done,
            on_error,
        }
    }
}

impl<D, F, E> StreamHandler for Callbacks<D, F, E>
where
    D: FnMut(&str),
    F: FnMut(),
    E: FnMut(&str),
{
    fn on_delta(&mut self, text: &str) {
        (self.on_delta)(text)
    }

    fn on_done(&mut self) {
        (self.on_done)()
    }

    fn on_error(&mut self, message: &str) {
        (self.on_error)(message)
    }
}

/// Records every callback; handy for CLIs and tests
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub deltas: Vec<String>,
    pub done_calls: usize,
    pub error: Option<String>,
}

impl Transcript {
    /// All text received so far
    pub fn text(&self) -> String {
        self.deltas.concat()
    }
}

impl StreamHandler for Transcript {
    fn on_delta(&mut self, text: &str) {
        self.deltas.push(text.to_string());
    }

    fn on_done(&mut self) {
        self.done_calls += 1;
    }

    fn on_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callbacks_forward() {
        let mut text = String::new();
        let mut done = false;
        let mut error = None;
        {
            let mut handler = Callbacks::new(
                |t: &str| text.push_str(t),
                || done = true,
                |e: &str| error = Some(e.to_string()),
            );
            handler.on_delta("Under ");
            handler.on_delta("Florida law");
            handler.on_error("boom");
            handler.on_done();
        }
        assert_eq!(text, "Under Florida law");
        assert!(done);
        assert_eq!(error.as_deref(), Some("boom"));
    }
}
