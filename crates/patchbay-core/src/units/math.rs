//! Stateless arithmetic and logic units.

use crate::math::{gate, is_high};
use crate::port::{In, Out};
use crate::unit::{Capabilities, Io, Processor, Unit};

use super::Registry;

struct Unary {
    x: In,
    out: Out,
    op: fn(f64) -> f64,
}

impl Processor for Unary {
    fn process_sample(&mut self, i: usize) {
        self.out.write(i, (self.op)(self.x.read(i)));
    }

    fn process_frame(&mut self, n: usize) {
        let op = self.op;
        for i in 0..n {
            self.out.write(i, op(self.x.read(i)));
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::FRAME
    }
}

struct Binary {
    x: In,
    y: In,
    out: Out,
    op: fn(f64, f64) -> f64,
}

impl Processor for Binary {
    fn process_sample(&mut self, i: usize) {
        self.out
            .write(i, (self.op)(self.x.read(i), self.y.read(i)));
    }

    fn process_frame(&mut self, n: usize) {
        let op = self.op;
        for i in 0..n {
            self.out.write(i, op(self.x.read(i), self.y.read(i)));
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::FRAME
    }
}

fn unary(mut io: Io, op: fn(f64) -> f64) -> Unit {
    let x = io.new_in("x", 0.0);
    let out = io.new_out("out");
    Unit::new(io, Unary { x, out, op })
}

fn binary(mut io: Io, op: fn(f64, f64) -> f64) -> Unit {
    let x = io.new_in("x", 0.0);
    let y = io.new_in("y", 0.0);
    let out = io.new_out("out");
    Unit::new(io, Binary { x, y, out, op })
}

fn checked(y: f64, f: impl FnOnce() -> f64) -> f64 {
    if y == 0.0 { 0.0 } else { f() }
}

pub(super) fn register(registry: &mut Registry) {
    registry.register("abs", |io, _| Ok(unary(io, f64::abs)));
    registry.register("bipolar", |io, _| Ok(unary(io, |x| x * 2.0 - 1.0)));
    registry.register("ceil", |io, _| Ok(unary(io, f64::ceil)));
    registry.register("floor", |io, _| Ok(unary(io, f64::floor)));
    registry.register("invert", |io, _| Ok(unary(io, |x| -x)));
    registry.register("not", |io, _| Ok(unary(io, |x| gate(!is_high(x)))));
    registry.register("noop", |io, _| Ok(unary(io, |x| x)));
    registry.register("unipolar", |io, _| Ok(unary(io, |x| (x + 1.0) / 2.0)));

    registry.register("sum", |io, _| Ok(binary(io, |x, y| x + y)));
    registry.register("diff", |io, _| Ok(binary(io, |x, y| x - y)));
    registry.register("mult", |io, _| Ok(binary(io, |x, y| x * y)));
    registry.register("div", |io, _| Ok(binary(io, |x, y| checked(y, || x / y))));
    registry.register("mod", |io, _| Ok(binary(io, |x, y| checked(y, || x % y))));
    registry.register("min", |io, _| Ok(binary(io, f64::min)));
    registry.register("max", |io, _| Ok(binary(io, f64::max)));
    registry.register("and", |io, _| {
        Ok(binary(io, |x, y| gate(is_high(x) && is_high(y))))
    });
    registry.register("or", |io, _| {
        Ok(binary(io, |x, y| gate(is_high(x) || is_high(y))))
    });
    registry.register("xor", |io, _| {
        Ok(binary(io, |x, y| gate(is_high(x) != is_high(y))))
    });
    registry.register("imply", |io, _| {
        Ok(binary(io, |x, y| gate(!is_high(x) || is_high(y))))
    });
    registry.register("nand", |io, _| {
        Ok(binary(io, |x, y| gate(!(is_high(x) && is_high(y)))))
    });
    registry.register("nor", |io, _| {
        Ok(binary(io, |x, y| gate(!(is_high(x) || is_high(y)))))
    });
    registry.register("xnor", |io, _| {
        Ok(binary(io, |x, y| gate(is_high(x) == is_high(y))))
    });
    registry.register("gt", |io, _| Ok(binary(io, |x, y| gate(x > y))));
    registry.register("lt", |io, _| Ok(binary(io, |x, y| gate(x < y))));
}
