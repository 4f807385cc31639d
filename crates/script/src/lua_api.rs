//! Lua userdata for the `canvas` and `ctx` script parameters.
//!
//! Both handles wrap the same shared `DrawContext`; Lua never owns drawing
//! state, it only forwards calls. The API follows the browser 2D context, so
//! methods are invoked with `:` (`ctx:fillRect(0, 0, 10, 10)`) and styles are
//! plain fields (`ctx.fillStyle = '#111827'`).
//!
//! # API
//!
//! ## canvas
//! - `canvas.width`, `canvas.height` → buffer size (read-only)
//!
//! ## ctx fields
//! - `fillStyle`, `strokeStyle` → CSS color string or gradient
//! - `lineWidth`, `globalAlpha`, `font`, `textAlign`, `textBaseline`
//! - `shadowColor`, `shadowBlur` (tracked, not rendered)
//! - `canvas` → the canvas handle (read-only)
//!
//! ## ctx methods
//! - rectangles: `fillRect`, `strokeRect`, `clearRect`
//! - paths: `beginPath`, `closePath`, `moveTo`, `lineTo`, `rect`, `arc`,
//!   `quadraticCurveTo`, `bezierCurveTo`, `fill`, `stroke`
//! - state: `save`, `restore`, `translate`, `scale`, `rotate`,
//!   `setTransform`, `resetTransform`
//! - text: `fillText`, `strokeText`
//! - `createLinearGradient(x0, y0, x1, y1)` → gradient with `addColorStop(offset, color)`

use mlua::{Lua, Result as LuaResult, UserData, UserDataFields, UserDataMethods, Value};
use std::cell::RefCell;
use std::rc::Rc;

use crate::context::{DrawContext, Paint, SharedGradient};
use crate::transform::Transform;

/// The one drawing context shared by the host and a running script
pub type SharedContext = Rc<RefCell<DrawContext>>;

/// `canvas` parameter
#[derive(Clone)]
pub struct CanvasHandle(pub SharedContext);

/// `ctx` parameter
#[derive(Clone)]
pub struct ContextHandle(pub SharedContext);

/// Value returned by `ctx:createLinearGradient`
#[derive(Clone)]
pub struct GradientHandle(pub SharedGradient);

/// Both script parameters for one shared context
pub fn handles(shared: &SharedContext) -> (CanvasHandle, ContextHandle) {
    (CanvasHandle(Rc::clone(shared)), ContextHandle(Rc::clone(shared)))
}

impl UserData for CanvasHandle {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("width", |_, this| Ok(this.0.borrow().width()));
        fields.add_field_method_get("height", |_, this| Ok(this.0.borrow().height()));
    }
}

impl UserData for GradientHandle {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("addColorStop", |_, this, (offset, color): (f64, String)| {
            this.0
                .borrow_mut()
                .add_color_stop(offset, &color)
                .map_err(|e| mlua::Error::RuntimeError(e.to_string()))
        });
    }
}

/// Paint for a `fillStyle`/`strokeStyle` assignment. `None` keeps the old style.
fn paint_from_value(value: &Value) -> Option<Paint> {
    match value {
        Value::String(s) => {
            let css = s.to_string_lossy().to_string();
            crate::color::Color::parse(&css).map(Paint::Color)
        }
        Value::UserData(ud) => ud
            .borrow::<GradientHandle>()
            .ok()
            .map(|g| Paint::Gradient(Rc::clone(&g.0))),
        _ => None,
    }
}

fn paint_to_value(lua: &Lua, paint: &Paint) -> LuaResult<Value> {
    match paint {
        Paint::Color(c) => Ok(Value::String(lua.create_string(c.to_string())?)),
        Paint::Gradient(g) => Ok(Value::UserData(lua.create_userdata(GradientHandle(Rc::clone(g)))?)),
    }
}

impl UserData for ContextHandle {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("canvas", |_, this| Ok(CanvasHandle(Rc::clone(&this.0))));

        fields.add_field_method_get("fillStyle", |lua, this| paint_to_value(lua, this.0.borrow().fill_style()));
        fields.add_field_method_set("fillStyle", |_, this, value: Value| {
            if let Some(paint) = paint_from_value(&value) {
                this.0.borrow_mut().set_fill_style(paint);
            }
            Ok(())
        });

        fields.add_field_method_get("strokeStyle", |lua, this| paint_to_value(lua, this.0.borrow().stroke_style()));
        fields.add_field_method_set("strokeStyle", |_, this, value: Value| {
            if let Some(paint) = paint_from_value(&value) {
                this.0.borrow_mut().set_stroke_style(paint);
            }
            Ok(())
        });

        fields.add_field_method_get("lineWidth", |_, this| Ok(this.0.borrow().line_width()));
        fields.add_field_method_set("lineWidth", |_, this, v: f64| {
            this.0.borrow_mut().set_line_width(v);
            Ok(())
        });

        fields.add_field_method_get("globalAlpha", |_, this| Ok(this.0.borrow().global_alpha()));
        fields.add_field_method_set("globalAlpha", |_, this, v: f64| {
            this.0.borrow_mut().set_global_alpha(v);
            Ok(())
        });

        fields.add_field_method_get("font", |_, this| Ok(this.0.borrow().font().to_string()));
        fields.add_field_method_set("font", |_, this, v: String| {
            this.0.borrow_mut().set_font(&v);
            Ok(())
        });

        fields.add_field_method_get("textAlign", |_, this| Ok(this.0.borrow().text_align().to_string()));
        fields.add_field_method_set("textAlign", |_, this, v: String| {
            this.0.borrow_mut().set_text_align(&v);
            Ok(())
        });

        fields.add_field_method_get("textBaseline", |_, this| Ok(this.0.borrow().text_baseline().to_string()));
        fields.add_field_method_set("textBaseline", |_, this, v: String| {
            this.0.borrow_mut().set_text_baseline(&v);
            Ok(())
        });

        fields.add_field_method_get("shadowColor", |_, this| Ok(this.0.borrow().shadow_color().to_string()));
        fields.add_field_method_set("shadowColor", |_, this, v: String| {
            this.0.borrow_mut().set_shadow_color(&v);
            Ok(())
        });

        fields.add_field_method_get("shadowBlur", |_, this| Ok(this.0.borrow().shadow_blur()));
        fields.add_field_method_set("shadowBlur", |_, this, v: f64| {
            this.0.borrow_mut().set_shadow_blur(v);
            Ok(())
        });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        // Rectangles

        methods.add_method("fillRect", |_, this, (x, y, w, h): (f64, f64, f64, f64)| {
            this.0.borrow_mut().fill_rect(x, y, w, h);
            Ok(())
        });

        methods.add_method("strokeRect", |_, this, (x, y, w, h): (f64, f64, f64, f64)| {
            this.0.borrow_mut().stroke_rect(x, y, w, h);
            Ok(())
        });

        methods.add_method("clearRect", |_, this, (x, y, w, h): (f64, f64, f64, f64)| {
            this.0.borrow_mut().clear_rect(x, y, w, h);
            Ok(())
        });

        // Paths

        methods.add_method("beginPath", |_, this, ()| {
            this.0.borrow_mut().begin_path();
            Ok(())
        });

        methods.add_method("closePath", |_, this, ()| {
            this.0.borrow_mut().close_path();
            Ok(())
        });

        methods.add_method("moveTo", |_, this, (x, y): (f64, f64)| {
            this.0.borrow_mut().move_to(x, y);
            Ok(())
        });

        methods.add_method("lineTo", |_, this, (x, y): (f64, f64)| {
            this.0.borrow_mut().line_to(x, y);
            Ok(())
        });

        methods.add_method("rect", |_, this, (x, y, w, h): (f64, f64, f64, f64)| {
            this.0.borrow_mut().rect(x, y, w, h);
            Ok(())
        });

        methods.add_method(
            "arc",
            |_, this, (x, y, r, start, end, ccw): (f64, f64, f64, f64, f64, Option<bool>)| {
                this.0
                    .borrow_mut()
                    .arc(x, y, r, start, end, ccw.unwrap_or(false))
                    .map_err(mlua::Error::RuntimeError)
            },
        );

        methods.add_method("quadraticCurveTo", |_, this, (cpx, cpy, x, y): (f64, f64, f64, f64)| {
            this.0.borrow_mut().quadratic_curve_to(cpx, cpy, x, y);
            Ok(())
        });

        methods.add_method(
            "bezierCurveTo",
            |_, this, (c1x, c1y, c2x, c2y, x, y): (f64, f64, f64, f64, f64, f64)| {
                this.0.borrow_mut().bezier_curve_to(c1x, c1y, c2x, c2y, x, y);
                Ok(())
            },
        );

        methods.add_method("fill", |_, this, ()| {
            this.0.borrow_mut().fill();
            Ok(())
        });

        methods.add_method("stroke", |_, this, ()| {
            this.0.borrow_mut().stroke();
            Ok(())
        });

        // State and transforms

        methods.add_method("save", |_, this, ()| {
            this.0.borrow_mut().save();
            Ok(())
        });

        methods.add_method("restore", |_, this, ()| {
            this.0.borrow_mut().restore();
            Ok(())
        });

        methods.add_method("translate", |_, this, (x, y): (f64, f64)| {
            this.0.borrow_mut().translate(x, y);
            Ok(())
        });

        methods.add_method("scale", |_, this, (x, y): (f64, f64)| {
            this.0.borrow_mut().scale(x, y);
            Ok(())
        });

        methods.add_method("rotate", |_, this, angle: f64| {
            this.0.borrow_mut().rotate(angle);
            Ok(())
        });

        methods.add_method(
            "setTransform",
            |_, this, (a, b, c, d, e, f): (f64, f64, f64, f64, f64, f64)| {
                this.0.borrow_mut().set_transform(Transform::new(a, b, c, d, e, f));
                Ok(())
            },
        );

        methods.add_method("resetTransform", |_, this, ()| {
            this.0.borrow_mut().reset_transform();
            Ok(())
        });

        // Text

        methods.add_method("fillText", |_, this, (text, x, y, max_width): (String, f64, f64, Option<f64>)| {
            this.0.borrow_mut().fill_text(&text, x, y, max_width);
            Ok(())
        });

        methods.add_method("strokeText", |_, this, (text, x, y, max_width): (String, f64, f64, Option<f64>)| {
            this.0.borrow_mut().stroke_text(&text, x, y, max_width);
            Ok(())
        });

        // Gradients

        methods.add_method("createLinearGradient", |_, _, (x0, y0, x1, y1): (f64, f64, f64, f64)| {
            DrawContext::create_linear_gradient(x0, y0, x1, y1)
                .map(|g| GradientHandle(Rc::new(RefCell::new(g))))
                .ok_or_else(|| mlua::Error::RuntimeError("createLinearGradient: non-finite coordinate".to_string()))
        });
    }
}
