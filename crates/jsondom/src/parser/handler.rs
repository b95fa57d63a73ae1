use crate::error::Result;

/// The capability set a [`Parser`](crate::Parser) drives.
///
/// Every operation may refuse by returning an error; the parser stops at the
/// first refusal and reports that error to its caller. All operations
/// default to accepting silently, so a handler only implements what it cares
/// about.
///
/// Strings and keys arrive in pieces when the parser suspends inside them:
/// any number of `*_part` calls carry the decoded prefix seen so far, and
/// the final call without the `_part` suffix carries the tail and marks
/// completion.
pub trait Handler {
    fn on_document_begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_document_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_object_begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_object_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_array_begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_array_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_key_part(&mut self, _key: &str) -> Result<()> {
        Ok(())
    }

    fn on_key(&mut self, _key: &str) -> Result<()> {
        Ok(())
    }

    fn on_string_part(&mut self, _value: &str) -> Result<()> {
        Ok(())
    }

    fn on_string(&mut self, _value: &str) -> Result<()> {
        Ok(())
    }

    fn on_int64(&mut self, _value: i64) -> Result<()> {
        Ok(())
    }

    fn on_uint64(&mut self, _value: u64) -> Result<()> {
        Ok(())
    }

    fn on_double(&mut self, _value: f64) -> Result<()> {
        Ok(())
    }

    fn on_bool(&mut self, _value: bool) -> Result<()> {
        Ok(())
    }

    fn on_null(&mut self) -> Result<()> {
        Ok(())
    }
}
