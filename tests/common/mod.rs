use pick_tree::{PickRequest, Script, ScriptOptions};

#[must_use]
pub fn logged() -> ScriptOptions {
    ScriptOptions {
        cachable: false,
        log_calls: true,
    }
}

/// One bit, as a bool.
#[must_use]
pub fn boolean() -> Script<bool> {
    Script::of("boolean", |pick| {
        let bit = PickRequest::new(0, 1).expect("valid range");
        Ok(pick.pick(&bit)? == 1)
    })
}

/// A lowercase string; every letter is guarded by a continue bit.
#[must_use]
pub fn short_string() -> Script<String> {
    Script::with_options("string", logged(), |pick| {
        let more = PickRequest::new(0, 1).expect("valid range");
        let letter = PickRequest::new(97, 122).expect("valid range");
        let mut out = String::new();

        while pick.pick(&more)? == 1 {
            let code = pick.pick(&letter)?;
            out.push(char::from(code as u8));
        }

        Ok(out)
    })
}

/// A list of `item` values.
///
/// Each element is one call group holding its own continue bit, so
/// shrinking can snip elements without disturbing the rest of the trace.
#[must_use]
pub fn short_list_of<T: Clone + 'static>(item: Script<T>) -> Script<Vec<T>> {
    let entry = Script::of("list entry", move |pick| {
        let more = PickRequest::with_default(0, 1, 0).expect("valid range");

        if pick.pick(&more)? == 0 {
            return Ok(None);
        }

        Ok(Some(pick.pick_from(&item)?))
    });

    Script::with_options("list", logged(), move |pick| {
        let mut items = Vec::new();

        while let Some(item) = pick.pick_from(&entry)? {
            items.push(item);
        }

        Ok(items)
    })
}
