use std::{collections::HashMap, io::Read};

use anyhow::Context;
use log::{debug, warn};

use crate::{bytecode::Instruction, error::VmError, lex::Row};

/// A loaded program: the instruction table and where each label points.
#[derive(Debug, Default)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    pub labels: HashMap<String, usize>,
}

impl Program {
    pub fn label(&self, name: &str) -> Result<usize, VmError> {
        self.labels
            .get(name)
            .copied()
            .ok_or_else(|| VmError::UndefinedLabel(name.into()))
    }

    pub fn from_source(source: &str) -> anyhow::Result<Program> {
        let mut program = Program::default();
        // labels waiting for the next line that carries an instruction
        let mut pending = Vec::new();

        for (n, line) in source.lines().enumerate() {
            let row = Row::split(line).with_context(|| format!("line {}", n + 1))?;
            if !row.label.is_empty() {
                pending.push(row.label);
            }
            if row.words.is_empty() {
                continue;
            }

            let index = program.instructions.len();
            for label in pending.drain(..) {
                program.bind(label, index);
            }
            let words: Vec<&str> = row.words.iter().map(String::as_str).collect();
            program.instructions.push(Instruction::decode(&words));
        }

        let end = program.instructions.len();
        for label in pending {
            warn!("label `{label}` is not followed by an instruction");
            program.bind(label, end);
        }

        debug!(
            "loaded {} instructions, {} labels",
            program.instructions.len(),
            program.labels.len()
        );
        Ok(program)
    }

    fn bind(&mut self, label: String, index: usize) {
        if let Some(old) = self.labels.insert(label.clone(), index) {
            warn!("label `{label}` redefined: {old} -> {index}");
        }
    }
}

pub fn load(mut input: impl Read) -> anyhow::Result<Program> {
    let mut buf = String::new();
    input.read_to_string(&mut buf)?;
    Program::from_source(&buf)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::bytecode::SysCall;

    #[test]
    fn labels_index_instructions() {
        let program = Program::from_source(
            "      LIT 1\n\
             loop  SOS OUTPUT\n\
             \x20     GOTO loop\n",
        )
        .unwrap();
        assert_eq!(program.instructions.len(), 3);
        assert_eq!(program.label("loop").unwrap(), 1);
        assert_eq!(program.instructions[2], Instruction::Goto("loop".into()));
    }

    #[test]
    fn blank_lines_take_no_slot() {
        let program = Program::from_source(
            "# header comment\n\
             \n\
             \x20  NOP\n\
             \x20  # between\n\
             \x20  HALT\n",
        )
        .unwrap();
        assert_eq!(
            program.instructions,
            vec![Instruction::Nop, Instruction::Halt]
        );
    }

    #[test]
    fn label_only_line_binds_to_next_instruction() {
        let program = Program::from_source(
            "     NOP\n\
             a\n\
             b    # two labels, one slot\n\
             \n\
             \x20    SOS OUTPUTL\n\
             tail\n",
        )
        .unwrap();
        assert_eq!(program.label("a").unwrap(), 1);
        assert_eq!(program.label("b").unwrap(), 1);
        assert_eq!(program.instructions[1], Instruction::Sos(SysCall::OutputL));
        assert_eq!(program.label("tail").unwrap(), 2);
    }

    #[test]
    fn later_definition_wins() {
        let program = Program::from_source("x NOP\nx HALT\n").unwrap();
        assert_eq!(program.label("x").unwrap(), 1);
    }

    #[test]
    fn missing_label() {
        let program = Program::from_source("  HALT\n").unwrap();
        assert!(matches!(
            program.label("nowhere"),
            Err(VmError::UndefinedLabel(name)) if name == "nowhere"
        ));
    }

    #[test]
    fn load_from_reader() {
        let program = load(&b"  LIT 3\n  HALT"[..]).unwrap();
        assert_eq!(
            program.instructions,
            vec![Instruction::Lit(3), Instruction::Halt]
        );
    }
}
