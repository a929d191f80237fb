/// Destination for filter diagnostics during one execution.
///
/// Messages are appended in the order filters report them. Without a backing
/// collection they are dropped.
#[derive(Debug)]
pub struct ErrorSink<'a> {
    out: Option<&'a mut Vec<String>>,
    pushed: usize,
}

impl<'a> ErrorSink<'a> {
    pub fn new(out: Option<&'a mut Vec<String>>) -> Self {
        Self { out, pushed: 0 }
    }

    pub fn discarding() -> Self {
        Self::new(None)
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.pushed += 1;
        // Without a backing list the text goes nowhere, not even the log.
        if let Some(out) = self.out.as_deref_mut() {
            let message = message.into();
            log::debug!("filter error: {message}");
            out.push(message);
        }
    }

    pub fn is_collecting(&self) -> bool {
        self.out.is_some()
    }

    /// Messages reported through this sink, whether retained or not.
    pub fn len(&self) -> usize {
        self.pushed
    }

    pub fn is_empty(&self) -> bool {
        self.pushed == 0
    }
}
