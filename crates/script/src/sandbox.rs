//! Script sandbox.
//!
//! Compiles sanitized script text into a function of `(canvas, ctx)` and
//! calls it against the shared drawing context.
//!
//! # Architecture Notes
//!
//! Compilation and execution are behind the `Scripting` / `CompiledScript`
//! traits so the host never talks to Lua directly. The production
//! implementation, `LuaScripting`, owns one `mlua::Lua` for the lifetime of the
//! studio and installs an instruction hook per call that enforces the
//! wall-clock timeout and the instruction budget.
//!
//! The sandbox does not isolate the host: scripts get the standard library.
//! Failures are returned as `ScriptError` values and never unwind past the
//! call. Drawing is not transactional; whatever was drawn before an error
//! stays on the surface.

use mlua::{Function, HookTriggers, Lua, MultiValue, Value, VmState};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::lua_api::{CanvasHandle, ContextHandle};

// ============================================================================
// Limits
// ============================================================================

/// Default wall-clock budget for one run
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default instruction budget for one run
pub const DEFAULT_INSTRUCTION_LIMIT: u64 = 200_000_000;

/// How often the hook checks the budgets (every N instructions)
pub const INSTRUCTION_HOOK_INTERVAL: u32 = 10_000;

/// Maximum lines of print output kept per run
pub const MAX_OUTPUT_LINES: usize = 1_000;

/// Chunk name shown in error locations (`canvas:3: ...`)
const CHUNK_NAME: &str = "=canvas";

/// Watchdog bounds. `None` disables a bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    pub timeout: Option<Duration>,
    pub instruction_limit: Option<u64>,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            instruction_limit: Some(DEFAULT_INSTRUCTION_LIMIT),
        }
    }
}

impl ExecutionLimits {
    /// From settings values, where 0 means unbounded
    pub fn from_settings(timeout_ms: u64, instruction_limit: u64) -> Self {
        Self {
            timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            instruction_limit: (instruction_limit > 0).then_some(instruction_limit),
        }
    }

    pub fn unbounded() -> Self {
        Self { timeout: None, instruction_limit: None }
    }

    fn is_unbounded(&self) -> bool {
        self.timeout.is_none() && self.instruction_limit.is_none()
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// The text is not a valid function body
    Compile(String),
    /// The script raised an error while drawing
    Runtime(String),
    /// Wall-clock budget exhausted
    Timeout(Duration),
    /// Instruction budget exhausted
    InstructionLimit(u64),
}

impl ScriptError {
    pub fn is_compile(&self) -> bool {
        matches!(self, ScriptError::Compile(_))
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::Compile(msg) => write!(f, "compile error: {}", msg),
            ScriptError::Runtime(msg) => write!(f, "runtime error: {}", msg),
            ScriptError::Timeout(limit) => write!(f, "execution timeout ({}ms limit)", limit.as_millis()),
            ScriptError::InstructionLimit(n) => write!(f, "instruction limit exceeded ({} instructions)", n),
        }
    }
}

impl std::error::Error for ScriptError {}

// ============================================================================
// Capability traits
// ============================================================================

/// Turns script text into something callable
pub trait Scripting {
    fn compile<'a>(&'a self, source: &str) -> Result<Box<dyn CompiledScript + 'a>, ScriptError>;
}

/// A compiled `function(canvas, ctx)`
pub trait CompiledScript {
    fn call(&self, canvas: CanvasHandle, ctx: ContextHandle) -> Result<(), ScriptError>;
}

// ============================================================================
// Lua implementation
// ============================================================================

/// print() capture, shared between the Lua closure and the runtime
struct OutputState {
    lines: Vec<String>,
    truncated: bool,
}

impl OutputState {
    fn new() -> Self {
        Self { lines: Vec::new(), truncated: false }
    }

    fn clear(&mut self) {
        self.lines.clear();
        self.truncated = false;
    }

    fn push(&mut self, line: String) {
        if self.lines.len() < MAX_OUTPUT_LINES {
            log::info!(target: "script", "{}", line);
            self.lines.push(line);
        } else if !self.truncated {
            self.truncated = true;
            log::warn!(target: "script", "output truncated ({} line limit)", MAX_OUTPUT_LINES);
        }
    }
}

pub struct LuaScripting {
    lua: Lua,
    output: Rc<RefCell<OutputState>>,
    limits: ExecutionLimits,
}

impl LuaScripting {
    pub fn new(limits: ExecutionLimits) -> mlua::Result<Self> {
        let lua = Lua::new();
        let output = Rc::new(RefCell::new(OutputState::new()));

        {
            let state = Rc::clone(&output);
            let print_fn = lua.create_function(move |_, args: MultiValue| {
                let parts: Vec<String> = args.into_iter().map(|v| lua_value_to_string(&v)).collect();
                state.borrow_mut().push(parts.join("\t"));
                Ok(())
            })?;
            lua.globals().set("print", print_fn)?;
        }

        Ok(Self { lua, output, limits })
    }

    pub fn limits(&self) -> ExecutionLimits {
        self.limits
    }

    pub fn set_limits(&mut self, limits: ExecutionLimits) {
        self.limits = limits;
    }

    /// Lines printed during the last call
    pub fn output(&self) -> Vec<String> {
        self.output.borrow().lines.clone()
    }

    pub fn output_truncated(&self) -> bool {
        self.output.borrow().truncated
    }

    fn run(&self, func: &Function, canvas: CanvasHandle, ctx: ContextHandle) -> Result<(), ScriptError> {
        self.output.borrow_mut().clear();

        let limits = self.limits;
        let start_time = Instant::now();
        let budget = Arc::new(AtomicI64::new(
            limits.instruction_limit.map_or(i64::MAX, |n| n.min(i64::MAX as u64) as i64),
        ));
        let was_timed_out = Arc::new(AtomicBool::new(false));

        if !limits.is_unbounded() {
            let budget_clone = Arc::clone(&budget);
            let was_timed_out_clone = Arc::clone(&was_timed_out);
            self.lua.set_hook(
                HookTriggers::new().every_nth_instruction(INSTRUCTION_HOOK_INTERVAL),
                move |_lua, _debug| {
                    if let Some(timeout) = limits.timeout {
                        if start_time.elapsed() > timeout {
                            was_timed_out_clone.store(true, Ordering::Relaxed);
                            return Err(mlua::Error::RuntimeError(format!(
                                "execution timeout ({}ms limit)",
                                timeout.as_millis()
                            )));
                        }
                    }
                    if let Some(limit) = limits.instruction_limit {
                        let remaining =
                            budget_clone.fetch_sub(INSTRUCTION_HOOK_INTERVAL as i64, Ordering::Relaxed);
                        if remaining <= 0 {
                            return Err(mlua::Error::RuntimeError(format!(
                                "instruction limit exceeded ({} instructions)",
                                limit
                            )));
                        }
                    }
                    Ok(VmState::Continue)
                },
            );
        }

        let result = func.call::<()>((canvas, ctx));

        if !limits.is_unbounded() {
            self.lua.remove_hook();
        }

        let elapsed = start_time.elapsed();
        match result {
            Ok(()) => {
                log::debug!("script finished in {:?}", elapsed);
                Ok(())
            }
            Err(e) => {
                if was_timed_out.load(Ordering::Relaxed) {
                    Err(ScriptError::Timeout(limits.timeout.unwrap_or_default()))
                } else if limits.instruction_limit.is_some() && budget.load(Ordering::Relaxed) <= 0 {
                    Err(ScriptError::InstructionLimit(limits.instruction_limit.unwrap_or_default()))
                } else {
                    Err(ScriptError::Runtime(format_lua_error(&e)))
                }
            }
        }
    }
}

impl Scripting for LuaScripting {
    fn compile<'a>(&'a self, source: &str) -> Result<Box<dyn CompiledScript + 'a>, ScriptError> {
        // Body on the header line so error line numbers match the editor
        let wrapped = format!("return function(canvas, ctx) {}\nend", source);
        let chunk = self
            .lua
            .load(&wrapped)
            .set_name(CHUNK_NAME)
            .into_function()
            .map_err(|e| ScriptError::Compile(format_lua_error(&e)))?;
        // Running the chunk only evaluates the function expression
        let func: Function = chunk.call(()).map_err(|e| ScriptError::Compile(format_lua_error(&e)))?;
        Ok(Box::new(LuaScript { runtime: self, func }))
    }
}

struct LuaScript<'a> {
    runtime: &'a LuaScripting,
    func: Function,
}

impl CompiledScript for LuaScript<'_> {
    fn call(&self, canvas: CanvasHandle, ctx: ContextHandle) -> Result<(), ScriptError> {
        self.runtime.run(&self.func, canvas, ctx)
    }
}

/// Convert a Lua value to a display string.
fn lua_value_to_string(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{:.0}", n)
            } else {
                format!("{}", n)
            }
        }
        Value::String(s) => s.to_string_lossy().to_string(),
        Value::Table(_) => "table".to_string(),
        Value::Function(_) => "function".to_string(),
        Value::Thread(_) => "thread".to_string(),
        Value::UserData(_) => "userdata".to_string(),
        Value::LightUserData(_) => "lightuserdata".to_string(),
        Value::Error(e) => format!("error: {}", e),
        _ => "<unknown>".to_string(),
    }
}

/// First line of a Lua error, without the traceback.
fn format_lua_error(error: &mlua::Error) -> String {
    let message = match error {
        mlua::Error::SyntaxError { message, .. } => message.clone(),
        mlua::Error::RuntimeError(msg) => msg.clone(),
        mlua::Error::CallbackError { cause, .. } => return format_lua_error(cause),
        _ => error.to_string(),
    };
    match message.find("\nstack traceback:") {
        Some(idx) => message[..idx].to_string(),
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DrawContext;
    use crate::lua_api::{handles, SharedContext};
    use crate::surface::Surface;

    fn shared(w: u32, h: u32) -> SharedContext {
        Rc::new(RefCell::new(DrawContext::new(Surface::new(w, h))))
    }

    fn run(scripting: &LuaScripting, ctx: &SharedContext, source: &str) -> Result<(), ScriptError> {
        let script = scripting.compile(source)?;
        let (canvas, handle) = handles(ctx);
        script.call(canvas, handle)
    }

    #[test]
    fn test_draws_through_ctx() {
        let scripting = LuaScripting::new(ExecutionLimits::default()).unwrap();
        let ctx = shared(10, 10);
        run(&scripting, &ctx, "ctx.fillStyle = 'red'\nctx:fillRect(0, 0, canvas.width, canvas.height)").unwrap();
        assert_eq!(ctx.borrow().surface().pixel(9, 9), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_local_config_is_visible() {
        let scripting = LuaScripting::new(ExecutionLimits::default()).unwrap();
        let ctx = shared(20, 20);
        let source = "local config <const> = { canvasWidth = 5, canvasHeight = 5 }\n\
                      ctx:fillRect(0, 0, config.canvasWidth, config.canvasHeight)";
        run(&scripting, &ctx, source).unwrap();
        let ctx = ctx.borrow();
        assert_eq!(ctx.surface().pixel(4, 4), Some([0, 0, 0, 255]));
        assert_eq!(ctx.surface().pixel(5, 5), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_partial_drawing_survives_runtime_error() {
        let scripting = LuaScripting::new(ExecutionLimits::default()).unwrap();
        let ctx = shared(10, 10);
        let err = run(&scripting, &ctx, "ctx:fillRect(0, 0, 4, 4)\nundefined_fn()").unwrap_err();
        assert!(matches!(err, ScriptError::Runtime(_)));
        // Line numbers match the source text
        assert!(err.to_string().contains("canvas:2"), "{}", err);
        assert_eq!(ctx.borrow().surface().pixel(1, 1), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_compile_error() {
        let scripting = LuaScripting::new(ExecutionLimits::default()).unwrap();
        let err = scripting.compile("ctx:fillRect(0, 0,").err().unwrap();
        assert!(err.is_compile());
        // JS object syntax is not Lua
        let err = scripting.compile("local config <const> = { canvasWidth: 10 }").err().unwrap();
        assert!(err.is_compile());
    }

    #[test]
    fn test_compile_does_not_run_body() {
        let scripting = LuaScripting::new(ExecutionLimits::default()).unwrap();
        scripting.compile("error('boom')").unwrap();
    }

    #[test]
    fn test_instruction_limit() {
        let scripting = LuaScripting::new(ExecutionLimits {
            timeout: None,
            instruction_limit: Some(100_000),
        })
        .unwrap();
        let ctx = shared(1, 1);
        let err = run(&scripting, &ctx, "while true do end").unwrap_err();
        assert_eq!(err, ScriptError::InstructionLimit(100_000));
    }

    #[test]
    fn test_timeout() {
        let scripting = LuaScripting::new(ExecutionLimits {
            timeout: Some(Duration::from_millis(50)),
            instruction_limit: None,
        })
        .unwrap();
        let ctx = shared(1, 1);
        let err = run(&scripting, &ctx, "while true do end").unwrap_err();
        assert_eq!(err, ScriptError::Timeout(Duration::from_millis(50)));
    }

    #[test]
    fn test_limits_from_settings() {
        assert_eq!(ExecutionLimits::from_settings(0, 0), ExecutionLimits::unbounded());
        let limits = ExecutionLimits::from_settings(5000, 200_000_000);
        assert_eq!(limits, ExecutionLimits::default());
    }

    #[test]
    fn test_print_capture() {
        let scripting = LuaScripting::new(ExecutionLimits::default()).unwrap();
        let ctx = shared(1, 1);
        run(&scripting, &ctx, "print('hello', 42, nil)\nprint(1.5)").unwrap();
        assert_eq!(scripting.output(), vec!["hello\t42\tnil", "1.5"]);
    }

    #[test]
    fn test_print_is_capped() {
        let scripting = LuaScripting::new(ExecutionLimits::default()).unwrap();
        let ctx = shared(1, 1);
        run(&scripting, &ctx, "for i = 1, 1500 do print(i) end").unwrap();
        assert_eq!(scripting.output().len(), MAX_OUTPUT_LINES);
        assert!(scripting.output_truncated());
    }

    #[test]
    fn test_hook_removed_after_run() {
        let scripting = LuaScripting::new(ExecutionLimits {
            timeout: None,
            instruction_limit: Some(100_000),
        })
        .unwrap();
        let ctx = shared(1, 1);
        assert!(run(&scripting, &ctx, "while true do end").is_err());
        // A fresh run gets a fresh budget
        run(&scripting, &ctx, "local x = 0 for i = 1, 1000 do x = x + i end").unwrap();
    }
}
