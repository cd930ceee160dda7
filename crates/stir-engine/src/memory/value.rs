//! Payloads stored on data handles.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use smol_str::SmolStr;

use super::channels::Printer;
use super::objects::EngineObject;
use crate::fault::FaultResult;

/// An engine object shared between every data handle that references it
pub(crate) type Shared = Rc<RefCell<EngineObject>>;

/// Payload of a successful data handle
#[derive(Debug, Clone)]
pub(crate) enum Value {
    Char(SmolStr),
    Int(i32),
    Float(f32),
    Double(f64),
    Object(Shared),
    Printer(Rc<Printer>),
}

impl Value {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Value::Char(_) => "string",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Object(_) => "object",
            Value::Printer(_) => "printer",
        }
    }

    pub(crate) fn as_f32(&self) -> FaultResult<f32> {
        match self {
            Value::Float(v) => Ok(*v),
            Value::Double(v) => Ok(*v as f32),
            Value::Int(v) => Ok(*v as f32),
            Value::Char(s) => s
                .trim()
                .parse::<f32>()
                .map_err(|_| fault!("cannot read '{}' as a float", s)),
            other => Err(fault!("expected a float, got {}", other.kind())),
        }
    }

    pub(crate) fn as_i32(&self) -> FaultResult<i32> {
        match self {
            Value::Int(v) => Ok(*v),
            Value::Char(s) => s
                .trim()
                .parse::<i32>()
                .map_err(|_| fault!("cannot read '{}' as an integer", s)),
            other => Err(fault!("expected an integer, got {}", other.kind())),
        }
    }

    pub(crate) fn as_text(&self) -> FaultResult<SmolStr> {
        match self {
            Value::Char(s) => Ok(s.clone()),
            other => Err(fault!("expected a string, got {}", other.kind())),
        }
    }

    /// Flags arrive as strings and are answered as integers.
    pub(crate) fn as_flag(&self) -> FaultResult<bool> {
        match self {
            Value::Int(v) => Ok(*v != 0),
            Value::Char(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(fault!("cannot read '{}' as a flag", s)),
            },
            other => Err(fault!("expected a flag, got {}", other.kind())),
        }
    }

    pub(crate) fn as_object(&self) -> FaultResult<Shared> {
        match self {
            Value::Object(obj) => Ok(Rc::clone(obj)),
            other => Err(fault!("expected an object, got {}", other.kind())),
        }
    }

    pub(crate) fn flag(value: bool) -> Value {
        Value::Int(i32::from(value))
    }
}

pub(crate) fn borrow(obj: &Shared) -> FaultResult<Ref<'_, EngineObject>> {
    obj.try_borrow()
        .map_err(|_| fault!("object is already in use by this call"))
}

pub(crate) fn borrow_mut(obj: &Shared) -> FaultResult<RefMut<'_, EngineObject>> {
    obj.try_borrow_mut()
        .map_err(|_| fault!("object is already in use by this call"))
}
