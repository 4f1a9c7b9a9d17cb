use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tagrunner::{record, Context, Flow, Runner, Shape};

struct Hello {
    field_hello: String,
    foo: String,
}

record!(Hello {
    field_hello => r#"json:"field_hello" doctor:"hello=world1 world2""#,
    foo => r#"json:"f" bar:"update=v1 v2,validate""#,
});

#[test]
fn update_then_validate_shares_pass_by() {
    let mut target = Hello {
        field_hello: "hi".into(),
        foo: "bbb".into(),
    };

    let mut runner = Runner::new();
    runner.must_register("bar", "update", |_, info| {
        info.set_pass_by(1);
        let first = info.args[0].clone();
        info.set_field_value(first)?;
        Ok(Flow::Continue)
    });
    runner.must_register("bar", "validate", |_, info| {
        assert_eq!(info.pass_by(), &json!(1));
        assert_eq!(info.args, Vec::<String>::new());
        Ok(Flow::Continue)
    });

    runner.run_struct(&Context::new(), &mut target).unwrap();
    assert_eq!(target.foo, "v1");
    assert_eq!(target.field_hello, "hi");
}

#[derive(Default)]
struct Inner {
    field: String,
}

record!(Inner {
    field => r#"json:"field" doctor:"hello=world1 world2""#,
});

#[derive(Default)]
struct Outer {
    world: Inner,
}

record!(Outer {
    world => r#"foo:"bar=arg1 arg2""#,
});

#[test]
fn nested_records_chain_parents() {
    let mut target = Outer {
        world: Inner { field: "hi".into() },
    };

    let mut runner = Runner::new();
    runner.must_register("doctor", "hello", |_, info| {
        assert_eq!(info.args, vec!["world1", "world2"]);
        assert_eq!(info.pass_by(), &Value::Null);
        assert_eq!(info.field.json_name(), "field");
        assert_eq!(info.field.field_name(), "field");
        assert_eq!(info.field_value::<String>().map(String::as_str), Some("hi"));

        let parent = info.field.parent().expect("world");
        assert_eq!(parent.field_name(), "world");
        assert_eq!(parent.shape(), Shape::Record);
        assert!(!info.field.is_top());
        assert!(!parent.is_top());
        assert!(parent.parent().is_some_and(|root| root.is_top()));
        assert_eq!(info.field.path(), "world.field");
        Ok(Flow::Continue)
    });
    runner.must_register("foo", "bar", |_, info| {
        assert_eq!(info.args, vec!["arg1", "arg2"]);
        assert_eq!(info.field.json_name(), "world");
        assert_eq!(info.field.shape(), Shape::Record);
        assert!(info.field.parent().is_some_and(|root| root.is_top()));
        Ok(Flow::Continue)
    });

    runner.run_struct(&Context::new(), &mut target).unwrap();
}

#[test]
fn null_root_is_a_no_op() {
    let calls = Arc::new(Mutex::new(0));
    let seen = Arc::clone(&calls);

    let mut runner = Runner::new();
    runner.must_register("bar", "update", move |_, _| {
        *seen.lock().unwrap() += 1;
        Ok(Flow::Continue)
    });

    let mut target: Option<Hello> = None;
    runner.run(&Context::new(), &mut target).unwrap();
    assert_eq!(*calls.lock().unwrap(), 0);

    let mut scalar = String::from("plain");
    runner.run(&Context::new(), &mut scalar).unwrap();
    assert_eq!(*calls.lock().unwrap(), 0);
}

#[test]
fn run_accepts_pointer_to_record() {
    let mut target = Some(Box::new(Hello {
        field_hello: "hi".into(),
        foo: "bbb".into(),
    }));

    let mut runner = Runner::new();
    runner.must_register("bar", "update", |_, info| {
        info.set_field_value("set".to_string())?;
        Ok(Flow::Continue)
    });

    runner.run(&Context::new(), &mut target).unwrap();
    assert_eq!(target.map(|h| h.foo).as_deref(), Some("set"));
}

struct Multi {
    a: String,
    b: String,
}

record!(Multi {
    a => r#"k1:"one,two,three" k2:"only""#,
    b => r#"k1:"one,two""#,
});

fn recorder() -> (Arc<Mutex<Vec<String>>>, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    (Arc::clone(&log), log)
}

#[test]
fn skip_stops_only_the_same_key_on_the_same_field() {
    let (log, out) = recorder();
    let mut runner = Runner::new();

    for (key, value, skip) in [
        ("k1", "one", false),
        ("k1", "two", true),
        ("k1", "three", false),
        ("k2", "only", false),
    ] {
        let log = Arc::clone(&log);
        runner.must_register(key, value, move |_, info| {
            log.lock()
                .unwrap()
                .push(format!("{}.{}:{}", info.field.field_name(), info.key, info.value));
            Ok(Flow::from(skip))
        });
    }

    let mut target = Multi {
        a: String::new(),
        b: String::new(),
    };
    runner.run_struct(&Context::new(), &mut target).unwrap();

    assert_eq!(
        *out.lock().unwrap(),
        vec!["a.k1:one", "a.k1:two", "a.k2:only", "b.k1:one", "b.k1:two"]
    );
}

#[test]
fn unregistered_values_are_skipped_and_keep_pass_by() {
    let (log, out) = recorder();
    let mut runner = Runner::new();

    let first = Arc::clone(&log);
    runner.must_register("k1", "one", move |_, info| {
        first.lock().unwrap().push(format!("one:{}", info.pass_by()));
        info.set_pass_by("from-one");
        Ok(Flow::Continue)
    });
    // "two" has no handler
    let third = Arc::clone(&log);
    runner.must_register("k1", "three", move |_, info| {
        third.lock().unwrap().push(format!("three:{}", info.pass_by()));
        Ok(Flow::Continue)
    });

    let mut target = Multi {
        a: String::new(),
        b: String::new(),
    };
    runner.run_struct(&Context::new(), &mut target).unwrap();

    assert_eq!(
        *out.lock().unwrap(),
        vec!["one:null", "three:\"from-one\"", "one:null"]
    );
}

#[derive(Default)]
struct Base {
    hi: String,
}

record!(Base {
    hi => r#"doctor:"hello=a1 a2""#,
});

#[derive(Default)]
struct Derived {
    base: Base,
    own: String,
}

record!(Derived {
    #[embedded] base => r#"doctor:"hello=outer""#,
    own => "",
});

#[test]
fn embedded_fields_are_dispatched_then_descended() {
    let (log, out) = recorder();
    let mut runner = Runner::new();
    runner.must_register("doctor", "hello", move |_, info| {
        log.lock().unwrap().push(format!(
            "{}:{}:{}",
            info.field.field_name(),
            info.field.is_embedded(),
            info.args.join(" ")
        ));
        Ok(Flow::Continue)
    });

    let mut target = Derived::default();
    runner.run_struct(&Context::new(), &mut target).unwrap();

    assert_eq!(
        *out.lock().unwrap(),
        vec!["base:true:outer", "hi:false:a1 a2"]
    );
}

#[test]
fn label_fn_overrides_json_name() {
    let mut runner = Runner::new();
    runner.set_label_fn(|f, _| format!("<{}>", f.field_name()));
    runner.must_register("doctor", "hello", |_, info| {
        assert_eq!(info.field.label_name(), "<field_hello>");
        assert_eq!(info.label_name(), "<field_hello>");
        assert_eq!(info.field.json_name(), "field_hello");
        Ok(Flow::Continue)
    });

    let mut target = Hello {
        field_hello: "hi".into(),
        foo: String::new(),
    };
    runner.run_struct(&Context::new(), &mut target).unwrap();
}

#[derive(Default)]
struct Holder {
    inner: Option<Inner>,
    after: String,
}

record!(Holder {
    inner => r#"doctor:"hello=outer""#,
    after => r#"doctor:"hello=after""#,
});

#[test]
fn none_field_is_dispatched_but_not_descended() {
    let (log, out) = recorder();
    let mut runner = Runner::new();
    runner.must_register("doctor", "hello", move |_, info| {
        log.lock().unwrap().push(format!(
            "{}:{}:{}",
            info.field.field_name(),
            info.field.shape(),
            info.args.join(" ")
        ));
        Ok(Flow::Continue)
    });

    let mut target = Holder::default();
    runner.run_struct(&Context::new(), &mut target).unwrap();
    assert_eq!(
        *out.lock().unwrap(),
        vec!["inner:pointer:outer", "after:scalar:after"]
    );

    // the same record with the pointer set is descended
    out.lock().unwrap().clear();
    let mut target = Holder {
        inner: Some(Inner { field: "hi".into() }),
        after: String::new(),
    };
    runner.run_struct(&Context::new(), &mut target).unwrap();
    assert_eq!(
        *out.lock().unwrap(),
        vec!["inner:pointer:outer", "field:scalar:world1 world2", "after:scalar:after"]
    );
}

#[test]
fn context_reaches_handlers() {
    let ctx = Context::new();
    ctx.cancel();

    let mut runner = Runner::new();
    runner.must_register("doctor", "hello", |ctx, _| {
        if ctx.is_cancelled() {
            return Err("cancelled".into());
        }
        Ok(Flow::Continue)
    });

    let mut target = Hello {
        field_hello: "hi".into(),
        foo: String::new(),
    };
    let err = runner.run_struct(&ctx, &mut target).unwrap_err();
    assert_eq!(err.runner_error().map(|e| e.raw().to_string()).as_deref(), Some("cancelled"));
}
