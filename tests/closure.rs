//! Integration tests for the discovery closure.
//!
//! Each test builds a small program with [`MetadataBuilder`], runs the [`Compiler`] from an
//! entry method and checks the emitted records.

use std::sync::Arc;

use cardinal::{prelude::*, Result};

const PUBLIC_STATIC: u32 = 0x0016;
const NEW_VIRTUAL: u32 = 0x01C6;
const OVERRIDE: u32 = 0x00C6;
const ABSTRACT: u32 = 0x05C6;

const LDARG_0: u8 = 0x02;
const LDARG_1: u8 = 0x03;
const LDC_I4_1: u8 = 0x17;
const LDC_I4_2: u8 = 0x18;
const POP: u8 = 0x26;
const CALL: u8 = 0x28;
const RET: u8 = 0x2A;
const CALLVIRT: u8 = 0x6F;
const LDSTR: u8 = 0x72;
const NEWOBJ: u8 = 0x73;
const LDFLD: u8 = 0x7B;
const STFLD: u8 = 0x7D;

/// Little helper to assemble method bodies.
#[derive(Default)]
struct Code(Vec<u8>);

impl Code {
    fn op(mut self, opcode: u8) -> Self {
        self.0.push(opcode);
        self
    }

    fn tok(mut self, opcode: u8, token: Token) -> Self {
        self.0.push(opcode);
        self.0.extend_from_slice(&token.value().to_le_bytes());
        self
    }

    fn body(self) -> Option<MethodBody> {
        Some(MethodBody::new(8, true, self.0))
    }
}

struct Basics {
    object: Token,
    int32: Token,
    string: Token,
}

fn basics(mb: &mut MetadataBuilder) -> Basics {
    let object = mb.add_type("System", "Object", TypeFlags::PUBLIC, None);
    let int32 = mb.add_type("System", "Int32", TypeFlags::PUBLIC, Some(object));
    let string = mb.add_type("System", "String", TypeFlags::PUBLIC, Some(object));
    Basics {
        object,
        int32,
        string,
    }
}

/// `Main` prints a literal, builds a `Counter`, calls `Next` on it and feeds the result to
/// the self-recursive `Fib`.
fn counter_program() -> ProgramMetadata {
    let mut mb = MetadataBuilder::new();
    let b = basics(&mut mb);

    let console = mb.add_type("System", "Console", TypeFlags::PUBLIC, Some(b.object));
    let write_line = mb.add_method(
        console,
        "WriteLine",
        PUBLIC_STATIC,
        None,
        vec![ParamDef::new(b.string)],
        None,
    );

    let counter = mb.add_type("Demo", "Counter", TypeFlags::PUBLIC, Some(b.object));
    let value = mb.add_field(counter, "value", b.int32, false);
    let ctor = mb.add_constructor(
        counter,
        false,
        vec![ParamDef::new(b.int32)],
        Code::default()
            .op(LDARG_0)
            .op(LDARG_1)
            .tok(STFLD, value)
            .op(RET)
            .body(),
    );
    let next = mb.add_method(
        counter,
        "Next",
        NEW_VIRTUAL,
        Some(b.int32),
        vec![],
        Code::default().op(LDARG_0).tok(LDFLD, value).op(RET).body(),
    );

    let program = mb.add_type("Demo", "Program", TypeFlags::PUBLIC, Some(b.object));
    let fib = Token::from_parts(TokenKind::MethodDef, 0x100);
    mb.define_method(
        fib,
        program,
        "Fib",
        PUBLIC_STATIC,
        Some(b.int32),
        vec![ParamDef::new(b.int32)],
        Code::default().op(LDARG_0).tok(CALL, fib).op(RET).body(),
    );

    let hello = mb.add_string("hello");
    mb.add_method(
        program,
        "Main",
        PUBLIC_STATIC,
        None,
        vec![],
        Code::default()
            .tok(LDSTR, hello)
            .tok(CALL, write_line)
            .op(LDC_I4_2)
            .tok(NEWOBJ, ctor)
            .tok(CALLVIRT, next)
            .tok(CALL, fib)
            .op(POP)
            .op(RET)
            .body(),
    );

    mb.build().unwrap()
}

fn native_console() -> ResolverConfig {
    ResolverConfig::new().native("System.Console", "WriteLine", "console_writeline")
}

fn compile(
    metadata: &ProgramMetadata,
    config: ResolverConfig,
    options: CompilerOptions,
) -> Result<Compilation> {
    let mut compiler = Compiler::new(metadata, config, options)?;
    compiler.add_entry_by_name("Demo.Program", "Main")?;
    compiler.compile()
}

#[test]
fn closure_reaches_every_referenced_callable() -> Result<()> {
    let metadata = counter_program();
    let compilation = compile(&metadata, native_console(), CompilerOptions::default())?;
    let records = &compilation.records;

    let names: Vec<&str> = records
        .method_records
        .iter()
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "System.Void____Demo.Program.Main_static",
            "System.Void___System.Int32___Demo.Counter..ctor_constr",
            "System.Int32____Demo.Counter.Next",
            "System.Int32___System.Int32___Demo.Program.Fib_static",
        ]
    );

    assert_eq!(
        records
            .native_methods
            .get("System.Void___System.String___System.Console.WriteLine_static")
            .map(String::as_str),
        Some("console_writeline")
    );

    let ctor = records
        .method("System.Void___System.Int32___Demo.Counter..ctor_constr")
        .unwrap();
    assert!(ctor.is_constructor);
    assert!(!ctor.is_static);
    assert_eq!(ctor.max_stack, 8);
    assert!(ctor.init_locals);

    let main = records.method("System.Void____Demo.Program.Main_static").unwrap();
    assert_eq!(main.strings[0], "hello");
    assert_eq!(
        main.strings[1],
        "System.Void___System.Int32___Demo.Counter..ctor_constr"
    );
    let ops: Vec<Operation> = main.tokens.iter().map(|t| t.operation).collect();
    assert_eq!(
        ops,
        vec![
            Operation::LoadString,
            Operation::Call,
            Operation::LoadConstant,
            Operation::NewObject,
            Operation::CallVirtual,
            Operation::Call,
            Operation::Pop,
            Operation::Return,
        ]
    );
    Ok(())
}

#[test]
fn type_records_cover_touched_types() -> Result<()> {
    let metadata = counter_program();
    let compilation = compile(&metadata, native_console(), CompilerOptions::default())?;
    let records = &compilation.records;

    for name in [
        "Demo.Program_static",
        "Demo.Counter",
        "Demo.Counter_static",
        "System.Object",
        "System.Int32_static",
    ] {
        assert!(records.type_record(name).is_some(), "missing {name}");
    }
    // Program is only used statically
    assert!(records.type_record("Demo.Program").is_none());
    // Native callables do not pull in their declaring type
    assert!(records.type_record("System.Console_static").is_none());

    let counter = records.type_record("Demo.Counter").unwrap();
    assert_eq!(
        counter.fields,
        vec![("System.Int32".to_string(), "value".to_string())]
    );

    let mut names: Vec<&String> = records.type_records.iter().map(|t| &t.name).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), records.type_records.len());
    assert_eq!(records.type_names.len(), records.type_records.len());

    let vtables: Vec<&str> = compilation
        .vtables
        .iter()
        .map(|t| t.type_name.as_str())
        .collect();
    assert_eq!(vtables, vec!["Demo.Counter", "System.Int32", "System.Object"]);
    Ok(())
}

#[test]
fn compiling_twice_is_idempotent() -> Result<()> {
    let metadata = counter_program();
    let mut compiler = Compiler::new(&metadata, native_console(), CompilerOptions::default())?;
    compiler.add_entry_by_name("Demo.Program", "Main")?;
    compiler.add_entry_by_name("Demo.Program", "Main")?;
    assert_eq!(compiler.entries().len(), 1);

    let first = compiler.compile()?;
    let second = compiler.compile()?;
    assert_eq!(first.records, second.records);
    assert_eq!(first.records.to_bytes(), second.records.to_bytes());
    assert_eq!(first.vtables.len(), second.vtables.len());
    Ok(())
}

#[test]
fn mutual_recursion_terminates() -> Result<()> {
    let mut mb = MetadataBuilder::new();
    let b = basics(&mut mb);
    let program = mb.add_type("Demo", "Program", TypeFlags::PUBLIC, Some(b.object));
    let ping_token = Token::from_parts(TokenKind::MethodDef, 0x10);
    let pong_token = Token::from_parts(TokenKind::MethodDef, 0x11);
    mb.define_method(
        ping_token,
        program,
        "Main",
        PUBLIC_STATIC,
        None,
        vec![],
        Code::default().tok(CALL, pong_token).op(RET).body(),
    );
    mb.define_method(
        pong_token,
        program,
        "Pong",
        PUBLIC_STATIC,
        None,
        vec![],
        Code::default().tok(CALL, ping_token).op(RET).body(),
    );
    let metadata = mb.build()?;

    let compilation = compile(&metadata, ResolverConfig::new(), CompilerOptions::default())?;
    assert_eq!(compilation.records.method_records.len(), 2);
    Ok(())
}

/// `Main` calls the abstract `Shape.Area` on a `Square`.
fn shape_program() -> ProgramMetadata {
    let mut mb = MetadataBuilder::new();
    let b = basics(&mut mb);

    let shape = mb.add_type(
        "Demo",
        "Shape",
        TypeFlags::PUBLIC | TypeFlags::ABSTRACT,
        Some(b.object),
    );
    let area = mb.add_method(shape, "Area", ABSTRACT, Some(b.int32), vec![], None);

    let square = mb.add_type("Demo", "Square", TypeFlags::PUBLIC, Some(shape));
    let ctor = mb.add_constructor(square, false, vec![], Code::default().op(RET).body());
    mb.add_method(
        square,
        "Area",
        OVERRIDE,
        Some(b.int32),
        vec![],
        Code::default().op(LDC_I4_1).op(RET).body(),
    );

    let program = mb.add_type("Demo", "Program", TypeFlags::PUBLIC, Some(b.object));
    mb.add_method(
        program,
        "Main",
        PUBLIC_STATIC,
        None,
        vec![],
        Code::default()
            .tok(NEWOBJ, ctor)
            .tok(CALLVIRT, area)
            .op(POP)
            .op(RET)
            .body(),
    );
    mb.build().unwrap()
}

#[test]
fn dispatch_targets_are_compiled() -> Result<()> {
    let metadata = shape_program();

    let with = compile(&metadata, ResolverConfig::new(), CompilerOptions::default())?;
    assert!(with
        .records
        .method("System.Int32____Demo.Square.Area")
        .is_some());
    assert!(with.records.method("System.Int32____Demo.Shape.Area").is_none());

    let square = with.vtable("Demo.Square").unwrap();
    assert_eq!(square.members[0].name, "Area");
    assert_eq!(square.conversion_offset("Demo.Shape"), Some(16));

    let without = compile(
        &metadata,
        ResolverConfig::new(),
        CompilerOptions::default().with_dispatch_targets(false),
    )?;
    assert!(without
        .records
        .method("System.Int32____Demo.Square.Area")
        .is_none());
    assert_eq!(without.records.method_records.len(), 2);
    Ok(())
}

#[test]
fn pointer_size_scales_offsets() -> Result<()> {
    let metadata = shape_program();
    let compilation = compile(
        &metadata,
        ResolverConfig::new(),
        CompilerOptions::default().with_pointer_size(4),
    )?;

    let square = compilation.vtable("Demo.Square").unwrap();
    assert_eq!(square.conversion_offset("Demo.Shape"), Some(8));
    // Square 2 + Shape 2 + Object 1 pointers
    assert_eq!(square.type_conversion_table_offset, 20);

    let err = Compiler::new(
        &metadata,
        ResolverConfig::new(),
        CompilerOptions::default().with_pointer_size(3),
    );
    assert!(matches!(err, Err(Error::Configuration(_))));
    Ok(())
}

#[test]
fn missing_body_is_fatal() -> Result<()> {
    let mut mb = MetadataBuilder::new();
    let b = basics(&mut mb);
    let program = mb.add_type("Demo", "Program", TypeFlags::PUBLIC, Some(b.object));
    let helper = mb.add_method(program, "Helper", PUBLIC_STATIC, None, vec![], None);
    mb.add_method(
        program,
        "Main",
        PUBLIC_STATIC,
        None,
        vec![],
        Code::default().tok(CALL, helper).op(RET).body(),
    );
    let metadata = mb.build()?;

    match compile(&metadata, ResolverConfig::new(), CompilerOptions::default()) {
        Err(Error::MissingMethodBody(name)) => {
            assert_eq!(name, "System.Void____Demo.Program.Helper_static");
        }
        other => panic!("unexpected result {other:?}"),
    }
    Ok(())
}

/// `Widget` inherits `Object.GetHashCode`, a virtual method the runtime implements.
fn runtime_slot_program(call_it: bool) -> ProgramMetadata {
    let mut mb = MetadataBuilder::new();
    let b = basics(&mut mb);
    let hash = mb.add_method(b.object, "GetHashCode", NEW_VIRTUAL, Some(b.int32), vec![], None);

    let widget = mb.add_type("Demo", "Widget", TypeFlags::PUBLIC, Some(b.object));
    let ctor = mb.add_constructor(widget, false, vec![], Code::default().op(RET).body());

    let program = mb.add_type("Demo", "Program", TypeFlags::PUBLIC, Some(b.object));
    let mut main = Code::default().tok(NEWOBJ, ctor);
    if call_it {
        main = main.tok(CALLVIRT, hash);
    }
    mb.add_method(
        program,
        "Main",
        PUBLIC_STATIC,
        None,
        vec![],
        main.op(POP).op(RET).body(),
    );
    mb.build().unwrap()
}

#[test]
fn bodiless_slots_are_left_to_the_runtime() -> Result<()> {
    let metadata = runtime_slot_program(false);
    let compilation = compile(&metadata, ResolverConfig::new(), CompilerOptions::default())?;

    let records = &compilation.records;
    assert_eq!(records.method_records.len(), 2);
    assert!(records.method("System.Void____Demo.Program.Main_static").is_some());
    assert!(records.method("System.Void____Demo.Widget..ctor_constr").is_some());
    assert!(compilation.vtable("Demo.Widget").is_some());

    let metadata = runtime_slot_program(true);
    match compile(&metadata, ResolverConfig::new(), CompilerOptions::default()) {
        Err(Error::MissingMethodBody(name)) => {
            assert_eq!(name, "System.Int32____System.Object.GetHashCode");
        }
        other => panic!("unexpected result {other:?}"),
    }
    Ok(())
}

#[test]
fn translation_errors_name_the_method() -> Result<()> {
    let mut mb = MetadataBuilder::new();
    let b = basics(&mut mb);
    let program = mb.add_type("Demo", "Program", TypeFlags::PUBLIC, Some(b.object));
    mb.add_method(
        program,
        "Main",
        PUBLIC_STATIC,
        None,
        vec![],
        Code::default().op(LDC_I4_1).op(LDC_I4_1).op(RET).body(),
    );
    let metadata = mb.build()?;

    match compile(&metadata, ResolverConfig::new(), CompilerOptions::default()) {
        Err(Error::StackImbalance { method, offset, .. }) => {
            assert_eq!(method, "System.Void____Demo.Program.Main_static");
            assert_eq!(offset, 2);
        }
        other => panic!("unexpected result {other:?}"),
    }
    Ok(())
}

#[test]
fn substituted_calls_compile_the_replacement() -> Result<()> {
    let mut mb = MetadataBuilder::new();
    let b = basics(&mut mb);
    let console = mb.add_type("System", "Console", TypeFlags::PUBLIC, Some(b.object));
    let write_line = mb.add_method(
        console,
        "WriteLine",
        PUBLIC_STATIC,
        None,
        vec![ParamDef::new(b.string)],
        None,
    );
    let kernel = mb.add_type("Kernel", "Console", TypeFlags::PUBLIC, Some(b.object));
    mb.add_field(kernel, "cursor", b.int32, true);
    mb.add_method(
        kernel,
        "WriteLine",
        PUBLIC_STATIC,
        None,
        vec![ParamDef::new(b.string)],
        Code::default().op(RET).body(),
    );
    let program = mb.add_type("Demo", "Program", TypeFlags::PUBLIC, Some(b.object));
    let text = mb.add_string("boot");
    mb.add_method(
        program,
        "Main",
        PUBLIC_STATIC,
        None,
        vec![],
        Code::default()
            .tok(LDSTR, text)
            .tok(CALL, write_line)
            .op(RET)
            .body(),
    );
    let metadata = mb.build()?;

    let config = ResolverConfig::new().substitute("System.Console", "Kernel.Console");
    let compilation = compile(&metadata, config, CompilerOptions::default())?;
    let records = &compilation.records;

    let replacement = "System.Void___System.String___Kernel.Console.WriteLine_static";
    assert!(records.method(replacement).is_some());
    let main = records.method("System.Void____Demo.Program.Main_static").unwrap();
    assert_eq!(main.tokens[1].string.as_deref(), Some(replacement));

    let statics = records.type_record("Kernel.Console_static").unwrap();
    assert_eq!(statics.fields[0].1, "cursor");
    // The static field's type is discovered in full
    assert!(records.type_record("System.Int32").is_some());
    Ok(())
}

#[test]
fn native_entry_is_only_bound() -> Result<()> {
    let metadata = counter_program();
    let mut compiler = Compiler::new(&metadata, native_console(), CompilerOptions::default())?;
    compiler.add_entry_by_name("System.Console", "WriteLine")?;

    let compilation = compiler.compile()?;
    assert!(compilation.records.method_records.is_empty());
    assert_eq!(compilation.records.native_methods.len(), 1);
    Ok(())
}

#[test]
fn entry_lookup_errors() -> Result<()> {
    let metadata = counter_program();
    let mut compiler = Compiler::new(&metadata, ResolverConfig::new(), CompilerOptions::default())?;

    assert!(matches!(
        compiler.add_entry_by_name("Demo.Missing", "Main"),
        Err(Error::Configuration(_))
    ));
    assert!(matches!(
        compiler.add_entry_by_name("Demo.Program", "Missing"),
        Err(Error::Configuration(_))
    ));
    assert!(matches!(compiler.compile(), Err(Error::Configuration(_))));

    compiler.add_entry_by_name("Demo.Counter", ".ctor")?;
    let compilation = compiler.compile()?;
    assert_eq!(compilation.records.method_records.len(), 2);
    Ok(())
}

/// Reports one type under another type's name.
struct Aliasing {
    inner: ProgramMetadata,
    alias: Token,
    namespace: String,
    name: String,
}

impl MetadataProvider for Aliasing {
    fn type_def(&self, token: Token) -> Result<Arc<TypeDef>> {
        let def = self.inner.type_def(token)?;
        if token != self.alias {
            return Ok(def);
        }
        let mut renamed = (*def).clone();
        renamed.namespace = self.namespace.clone();
        renamed.name = self.name.clone();
        Ok(Arc::new(renamed))
    }

    fn field(&self, token: Token) -> Result<Arc<FieldDef>> {
        self.inner.field(token)
    }

    fn callable(&self, token: Token) -> Result<Callable> {
        self.inner.callable(token)
    }

    fn user_string(&self, token: Token) -> Result<String> {
        self.inner.user_string(token)
    }

    fn find_type(&self, full_name: &str) -> Option<Arc<TypeDef>> {
        self.inner.find_type(full_name)
    }
}

#[test]
fn colliding_names_are_rejected() -> Result<()> {
    let mut mb = MetadataBuilder::new();
    let b = basics(&mut mb);
    let first = mb.add_type("Demo", "Twin", TypeFlags::PUBLIC, Some(b.object));
    let second = mb.add_type("Demo", "Other", TypeFlags::PUBLIC, Some(b.object));
    let make_first = mb.add_method(
        first,
        "Make",
        PUBLIC_STATIC,
        None,
        vec![],
        Code::default().op(RET).body(),
    );
    let make_second = mb.add_method(
        second,
        "Make",
        PUBLIC_STATIC,
        None,
        vec![],
        Code::default().op(RET).body(),
    );
    let program = mb.add_type("Demo", "Program", TypeFlags::PUBLIC, Some(b.object));
    let main = mb.add_method(
        program,
        "Main",
        PUBLIC_STATIC,
        None,
        vec![],
        Code::default()
            .tok(CALL, make_first)
            .tok(CALL, make_second)
            .op(RET)
            .body(),
    );

    let metadata = Aliasing {
        inner: mb.build()?,
        alias: second,
        namespace: "Demo".to_string(),
        name: "Twin".to_string(),
    };

    let mut compiler = Compiler::new(&metadata, ResolverConfig::new(), CompilerOptions::default())?;
    compiler.add_entry(main)?;
    match compiler.compile() {
        Err(Error::DuplicateDefinition { name }) => {
            assert_eq!(name, "System.Void____Demo.Twin.Make_static");
        }
        other => panic!("unexpected result {other:?}"),
    }
    Ok(())
}
