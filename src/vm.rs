use std::io::{BufRead, Write};

use log::{debug, trace, warn};

use crate::{
    bytecode::{Instruction, SysCall},
    error::{Fault, VmError},
    parse::Program,
    value::{Memory, Word, UNSET},
};

/// The four machine registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    /// Instruction pointer (`I`).
    pub ip: usize,
    /// Global base (`GBR`), fixed at the memory origin.
    pub gbr: Word,
    /// Local base (`LBR`), first slot of the running frame.
    pub lbr: Word,
    /// Stack top (`STR`), highest occupied slot; `-1` when empty.
    pub sp: Word,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            ip: 0,
            gbr: 0,
            lbr: 0,
            sp: -1,
        }
    }
}

/// What `CALL` leaves on the return stack.
#[derive(Debug, Clone, Copy)]
struct ReturnPoint {
    call_site: usize,
    frame_size: usize,
}

enum Flow {
    Next,
    Jump(usize),
    Halt,
}

#[derive(Debug, Default)]
pub struct ExeState {
    regs: Registers,
    memory: Memory,
    returns: Vec<ReturnPoint>,
    trace: bool,
}

impl ExeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print every instruction, `LBR` and the stack before it runs.
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn registers(&self) -> Registers {
        self.regs
    }

    /// Memory from the origin up to the stack top.
    pub fn stack(&self) -> Vec<Word> {
        self.memory.snapshot(self.regs.sp)
    }

    /// Runs `program` until `HALT`.
    pub fn execute<R, W>(
        &mut self,
        program: &Program,
        input: &mut R,
        output: &mut W,
    ) -> Result<(), Fault>
    where
        R: BufRead,
        W: Write,
    {
        debug!("executing {} instructions", program.instructions.len());
        loop {
            let index = self.regs.ip;
            let Some(ins) = program.instructions.get(index) else {
                flush_after_fault(output);
                return Err(Fault {
                    index,
                    instruction: "<end of program>".into(),
                    kind: VmError::InvalidAddress(index as Word),
                });
            };

            match self.step(ins, program, input, output) {
                Ok(Flow::Next) => self.regs.ip += 1,
                Ok(Flow::Jump(target)) => self.regs.ip = target,
                Ok(Flow::Halt) => {
                    debug!("halted at {index}");
                    return output.flush().map_err(|e| Fault {
                        index,
                        instruction: ins.to_string(),
                        kind: e.into(),
                    });
                }
                Err(kind) => {
                    flush_after_fault(output);
                    return Err(Fault {
                        index,
                        instruction: ins.to_string(),
                        kind,
                    });
                }
            }
        }
    }

    fn step<R: BufRead, W: Write>(
        &mut self,
        ins: &Instruction,
        program: &Program,
        input: &mut R,
        output: &mut W,
    ) -> Result<Flow, VmError> {
        if self.trace {
            writeln!(
                output,
                "{:<20}\t{}\t{:?}",
                ins.to_string(),
                self.regs.lbr,
                self.stack()
            )?;
        }

        match ins {
            Instruction::Nop => {}
            Instruction::Halt => return Ok(Flow::Halt),
            Instruction::Lit(v) => self.push(*v)?,
            Instruction::Llv(i) => {
                let v = self.get_local(*i)?;
                self.push(v)?;
            }
            Instruction::Lgv(i) => {
                let v = self.get_global(*i)?;
                self.push(v)?;
            }
            Instruction::Slv(i) => {
                let v = self.pop()?;
                self.set_local(*i, v)?;
            }
            Instruction::Sgv(i) => {
                let v = self.pop()?;
                self.set_global(*i, v)?;
            }
            Instruction::Lla(i) => {
                let addr = self.local_address(*i)?;
                self.push(addr)?;
            }
            Instruction::Lga(i) => {
                let addr = self.global_address(*i);
                self.push(addr)?;
            }
            Instruction::Uop(op) => {
                let x = self.pop()?;
                self.push(op.apply(x)?)?;
            }
            Instruction::Bop(op) => {
                let r = self.pop()?;
                let l = self.pop()?;
                self.push(op.apply(l, r)?)?;
            }
            Instruction::Pop(n) => {
                for _ in 0..*n {
                    self.pop()?;
                }
            }
            Instruction::Dup => {
                let v = self.top()?;
                self.push(v)?;
            }
            Instruction::Swap => {
                let one = self.pop()?;
                let two = self.pop()?;
                self.push(one)?;
                self.push(two)?;
            }
            Instruction::Call(n) => {
                let target = self.pop()?;
                let target =
                    usize::try_from(target).map_err(|_| VmError::InvalidAddress(target))?;
                self.returns.push(ReturnPoint {
                    call_site: self.regs.ip,
                    frame_size: *n,
                });
                self.open_frame(*n)?;
                return Ok(Flow::Jump(target));
            }
            Instruction::Rtn(n) => {
                self.collapse_frame(*n)?;
                let ret = self.returns.pop().ok_or(VmError::ReturnStackUnderflow)?;
                self.close_frame(ret.frame_size)?;
                return Ok(Flow::Jump(ret.call_site + 1));
            }
            Instruction::Goto(l) => return Ok(Flow::Jump(program.label(l)?)),
            Instruction::Cond(l, m) => {
                let (l, m) = (program.label(l)?, program.label(m)?);
                let target = if self.pop()? != 0 { l } else { m };
                return Ok(Flow::Jump(target));
            }
            Instruction::Code(f) => self.push(program.label(f)? as Word)?,
            Instruction::Sos(call) => self.sys_call(*call, input, output)?,
            Instruction::Unknown(raw) => return Err(VmError::UnknownInstruction(raw.clone())),
        }
        Ok(Flow::Next)
    }

    fn sys_call<R: BufRead, W: Write>(
        &mut self,
        call: SysCall,
        input: &mut R,
        output: &mut W,
    ) -> Result<(), VmError> {
        match call {
            SysCall::TraceX => self.trace = !self.trace,
            SysCall::DumpMem => writeln!(
                output,
                "LBR={} STR={} {:?}",
                self.regs.lbr,
                self.regs.sp,
                self.stack()
            )?,
            SysCall::Input => {
                let line = read_line(input, output)?;
                let v = line
                    .trim()
                    .parse()
                    .map_err(|_| VmError::InvalidInput(line.clone()))?;
                self.push(v)?;
            }
            SysCall::InputC => {
                let line = read_line(input, output)?;
                let mut chars = line.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => self.push(Word::from(u32::from(c)))?,
                    _ => return Err(VmError::InvalidInput(line)),
                }
            }
            SysCall::Output => write!(output, "{}", self.pop()?)?,
            SysCall::OutputC => {
                let v = self.pop()?;
                let c = u32::try_from(v)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or(VmError::InvalidCharacter(v))?;
                write!(output, "{c}")?;
            }
            SysCall::OutputL => writeln!(output)?,
            // end of input is never detected
            SysCall::Eof => self.push(0)?,
        }
        Ok(())
    }

    fn local_address(&self, i: Word) -> Result<Word, VmError> {
        self.regs
            .lbr
            .checked_add(i)
            .and_then(|a| a.checked_sub(self.regs.gbr))
            .ok_or(VmError::ArithmeticOverflow)
    }

    fn global_address(&self, i: Word) -> Word {
        i
    }

    /// Memory slot of a resolved address.
    fn slot(&self, addr: Word) -> Result<Word, VmError> {
        self.regs
            .gbr
            .checked_add(addr)
            .ok_or(VmError::ArithmeticOverflow)
    }

    fn set_local(&mut self, i: Word, v: Word) -> Result<(), VmError> {
        let addr = self.slot(self.local_address(i)?)?;
        self.memory.store(addr, v)
    }

    fn get_local(&self, i: Word) -> Result<Word, VmError> {
        self.memory.load(self.slot(self.local_address(i)?)?)
    }

    fn set_global(&mut self, i: Word, v: Word) -> Result<(), VmError> {
        let addr = self.slot(self.global_address(i))?;
        self.memory.store(addr, v)
    }

    fn get_global(&self, i: Word) -> Result<Word, VmError> {
        self.memory.load(self.slot(self.global_address(i))?)
    }

    fn depth(&self) -> Result<Word, VmError> {
        self.regs
            .sp
            .checked_sub(self.regs.lbr)
            .and_then(|d| d.checked_add(1))
            .ok_or(VmError::ArithmeticOverflow)
    }

    fn open_frame(&mut self, n: usize) -> Result<(), VmError> {
        self.regs.lbr = self
            .regs
            .lbr
            .checked_add(frame_words(n)?)
            .ok_or(VmError::ArithmeticOverflow)?;
        trace!("open frame {n}: LBR={}", self.regs.lbr);
        Ok(())
    }

    fn close_frame(&mut self, n: usize) -> Result<(), VmError> {
        self.regs.lbr = self
            .regs
            .lbr
            .checked_sub(frame_words(n)?)
            .ok_or(VmError::ArithmeticOverflow)?;
        trace!("close frame {n}: LBR={}", self.regs.lbr);
        Ok(())
    }

    /// Moves the top `n` values down to the frame base and drops the rest.
    fn collapse_frame(&mut self, n: usize) -> Result<(), VmError> {
        let n = frame_words(n)?;
        let start = self
            .depth()?
            .checked_sub(n)
            .ok_or(VmError::ArithmeticOverflow)?;
        if start > 0 {
            for j in 0..n {
                let from = start.checked_add(j).ok_or(VmError::ArithmeticOverflow)?;
                let v = self.get_local(from)?;
                self.set_local(j, v)?;
            }
            self.regs.sp = self
                .regs
                .sp
                .checked_sub(start)
                .ok_or(VmError::ArithmeticOverflow)?;
        }
        Ok(())
    }

    fn push(&mut self, v: Word) -> Result<(), VmError> {
        self.regs.sp += 1;
        self.memory.store(self.regs.sp, v)
    }

    fn pop(&mut self) -> Result<Word, VmError> {
        let v = self.top()?;
        self.memory.store(self.regs.sp, UNSET)?;
        self.regs.sp -= 1;
        Ok(v)
    }

    fn top(&self) -> Result<Word, VmError> {
        if self.regs.sp < self.regs.gbr {
            return Err(VmError::StackUnderflow);
        }
        self.memory.load(self.regs.sp)
    }
}

fn flush_after_fault<W: Write>(output: &mut W) {
    if let Err(e) = output.flush() {
        warn!("output lost after fault: {e}");
    }
}

fn frame_words(n: usize) -> Result<Word, VmError> {
    Word::try_from(n).map_err(|_| VmError::ArithmeticOverflow)
}

/// Reads one line without its terminator, flushing pending output first.
fn read_line<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<String, VmError> {
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(VmError::EndOfInput);
    }
    let len = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(len);
    Ok(line)
}
