//! The compiled, validated schema.
//!
//! A [`Schema`] is built once from a [`SchemaDocument`] and never mutated
//! afterwards. It owns every user-defined type plus the synthetic args and
//! result structs derived from each service function.

use crate::definition::{
    args_struct_name, result_struct_name, ConstDef, EnumDef, EnumValue, Field, FunctionDef,
    Requiredness, ServiceDef, StructDef, StructKind, TypedefDef, SUCCESS_FIELD_ID,
    SUCCESS_FIELD_NAME,
};
use crate::document::{FieldDoc, SchemaDocument, StructDoc};
use crate::error::SchemaError;
use crate::fingerprint;
use crate::types::{Type, TypeExpr};
use std::collections::{HashMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameKind {
    Enum,
    Typedef,
    Struct,
    Exception,
}

/// A function as seen through a service's flattened method table.
#[derive(Debug, Clone, Copy)]
pub struct MethodRef<'a> {
    /// Service that declares the function. Synthetic struct names use it.
    pub owner: &'a ServiceDef,
    pub function: &'a FunctionDef,
}

impl MethodRef<'_> {
    pub fn args_struct(&self) -> String {
        args_struct_name(&self.owner.name, &self.function.name)
    }

    pub fn result_struct(&self) -> String {
        result_struct_name(&self.owner.name, &self.function.name)
    }
}

/// Validated schema.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    namespace: Option<String>,
    enums: Vec<EnumDef>,
    typedefs: Vec<TypedefDef>,
    /// User structs in declaration order, then synthetic structs.
    structs: Vec<StructDef>,
    consts: Vec<ConstDef>,
    services: Vec<ServiceDef>,
    enum_index: HashMap<String, usize>,
    typedef_index: HashMap<String, usize>,
    struct_index: HashMap<String, usize>,
    service_index: HashMap<String, usize>,
}

impl Schema {
    pub fn from_json_str(s: &str) -> Result<Self, SchemaError> {
        SchemaDocument::from_json_str(s)?.compile()
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, SchemaError> {
        SchemaDocument::from_yaml_str(s)?.compile()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        SchemaDocument::from_file(path)?.compile()
    }

    /// Validates `doc` and builds the schema.
    pub fn compile(doc: &SchemaDocument) -> Result<Self, SchemaError> {
        let names = collect_names(doc)?;
        let mut schema = Schema {
            namespace: doc.namespace.clone(),
            ..Default::default()
        };

        for e in &doc.enums {
            schema.add_enum(compile_enum(e)?);
        }

        for t in &doc.typedefs {
            let target = resolve_expr(&names, &t.ty, &format!("typedef {}", t.name))?;
            schema.add_typedef(TypedefDef {
                name: t.name.clone(),
                target,
            });
        }
        schema.check_typedef_cycles()?;

        for s in &doc.structs {
            let def = compile_struct(&names, s, false)?;
            schema.add_struct(def);
        }
        for s in &doc.exceptions {
            let def = compile_struct(&names, s, true)?;
            schema.add_struct(def);
        }

        for svc in &doc.services {
            if schema.service_index.contains_key(&svc.name) {
                return Err(SchemaError::DuplicateService(svc.name.clone()));
            }
            let mut functions = Vec::with_capacity(svc.functions.len());
            for f in &svc.functions {
                functions.push(compile_function(&names, &svc.name, f)?);
            }
            schema.service_index.insert(svc.name.clone(), schema.services.len());
            schema.services.push(ServiceDef {
                name: svc.name.clone(),
                extends: svc.extends.clone(),
                functions,
            });
        }
        schema.check_services()?;
        schema.add_synthetic_structs()?;

        schema.normalize_defaults()?;

        let mut seen_consts = HashSet::new();
        for c in &doc.consts {
            if !seen_consts.insert(c.name.clone()) {
                return Err(SchemaError::DuplicateConst(c.name.clone()));
            }
            let ty = resolve_expr(&names, &c.ty, &format!("const {}", c.name))?;
            let value = c.value.normalize(&schema, &ty, &c.name)?;
            schema.consts.push(ConstDef {
                name: c.name.clone(),
                ty,
                value,
            });
        }

        let fingerprints = schema
            .structs
            .iter()
            .map(|s| fingerprint::struct_fingerprint(&schema, &s.name))
            .collect::<Result<Vec<_>, _>>()?;
        for (def, fp) in schema.structs.iter_mut().zip(fingerprints) {
            def.fingerprint = fp;
        }

        tracing::debug!(
            "compiled schema: {} enums, {} typedefs, {} structs, {} services",
            schema.enums.len(),
            schema.typedefs.len(),
            schema.structs.len(),
            schema.services.len()
        );

        Ok(schema)
    }

    fn add_enum(&mut self, def: EnumDef) {
        self.enum_index.insert(def.name.clone(), self.enums.len());
        self.enums.push(def);
    }

    fn add_typedef(&mut self, def: TypedefDef) {
        self.typedef_index.insert(def.name.clone(), self.typedefs.len());
        self.typedefs.push(def);
    }

    fn add_struct(&mut self, def: StructDef) {
        self.struct_index.insert(def.name.clone(), self.structs.len());
        self.structs.push(def);
    }

    fn check_typedef_cycles(&self) -> Result<(), SchemaError> {
        for def in &self.typedefs {
            let mut seen = HashSet::new();
            seen.insert(def.name.as_str());
            let mut current = &def.target;
            while let Type::Typedef(next) = current {
                if !seen.insert(next.as_str()) {
                    return Err(SchemaError::TypedefCycle(def.name.clone()));
                }
                current = match self.get_typedef(next) {
                    Some(t) => &t.target,
                    None => return Err(SchemaError::undefined(next, format!("typedef {}", def.name))),
                };
            }
        }
        Ok(())
    }

    fn check_services(&self) -> Result<(), SchemaError> {
        for svc in &self.services {
            // walks the parent chain, rejecting unknown parents and cycles
            let chain = self.ancestry(svc)?;

            let mut methods = HashSet::new();
            for ancestor in chain.iter().rev() {
                for f in &ancestor.functions {
                    if !methods.insert(f.name.as_str()) {
                        return Err(SchemaError::DuplicateMethod {
                            service: svc.name.clone(),
                            method: f.name.clone(),
                        });
                    }
                }
            }

            for f in &svc.functions {
                for t in &f.throws {
                    let is_exception = match &t.ty {
                        Type::Struct(name) => self.get_struct(name).map(|s| s.is_exception),
                        _ => None,
                    };
                    if is_exception != Some(true) {
                        return Err(SchemaError::NotAnException {
                            function: format!("{}.{}", svc.name, f.name),
                            name: t.ty.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns `service` followed by its ancestors, nearest first.
    fn ancestry<'a>(&'a self, service: &'a ServiceDef) -> Result<Vec<&'a ServiceDef>, SchemaError> {
        let mut chain = vec![service];
        let mut seen = HashSet::new();
        seen.insert(service.name.as_str());
        let mut current = service;
        while let Some(parent) = &current.extends {
            if !seen.insert(parent.as_str()) {
                return Err(SchemaError::ServiceCycle(service.name.clone()));
            }
            current = self
                .get_service(parent)
                .ok_or_else(|| SchemaError::UndefinedService(parent.clone()))?;
            chain.push(current);
        }
        Ok(chain)
    }

    fn add_synthetic_structs(&mut self) -> Result<(), SchemaError> {
        let mut synthetic = Vec::new();
        for svc in &self.services {
            for f in &svc.functions {
                synthetic.push(StructDef {
                    name: args_struct_name(&svc.name, &f.name),
                    fields: f.args.clone(),
                    is_exception: false,
                    kind: StructKind::Args,
                    fingerprint: String::new(),
                });

                if f.oneway {
                    continue;
                }
                let mut fields = Vec::with_capacity(f.throws.len() + 1);
                if !f.return_type.is_void() {
                    fields.push(Field::new(
                        SUCCESS_FIELD_ID,
                        SUCCESS_FIELD_NAME,
                        f.return_type.clone(),
                        Requiredness::Optional,
                    ));
                }
                for t in &f.throws {
                    let mut field = t.clone();
                    field.requiredness = Requiredness::Optional;
                    fields.push(field);
                }
                synthetic.push(StructDef {
                    name: result_struct_name(&svc.name, &f.name),
                    fields,
                    is_exception: false,
                    kind: StructKind::Result,
                    fingerprint: String::new(),
                });
            }
        }

        for def in synthetic {
            check_field_uniqueness(&def.name, &def.fields)?;
            if self.struct_index.contains_key(&def.name) || self.enum_index.contains_key(&def.name) {
                return Err(SchemaError::DuplicateType(def.name));
            }
            self.add_struct(def);
        }
        Ok(())
    }

    /// Type-checks declared field defaults and stores their normalized form.
    fn normalize_defaults(&mut self) -> Result<(), SchemaError> {
        let mut updates = Vec::new();
        for (si, def) in self.structs.iter().enumerate() {
            for (fi, field) in def.fields.iter().enumerate() {
                if let Some(default) = &field.default {
                    let context = format!("{}.{}", def.name, field.name);
                    updates.push((si, fi, default.normalize(self, &field.ty, &context)?));
                }
            }
        }
        for (si, fi, value) in updates {
            self.structs[si].fields[fi].default = Some(value);
        }
        Ok(())
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn enums(&self) -> &[EnumDef] {
        &self.enums
    }

    pub fn typedefs(&self) -> &[TypedefDef] {
        &self.typedefs
    }

    /// All structs, user-defined first, then synthetic.
    pub fn structs(&self) -> &[StructDef] {
        &self.structs
    }

    pub fn user_structs(&self) -> impl Iterator<Item = &StructDef> {
        self.structs.iter().filter(|s| !s.is_synthetic())
    }

    pub fn consts(&self) -> &[ConstDef] {
        &self.consts
    }

    pub fn services(&self) -> &[ServiceDef] {
        &self.services
    }

    pub fn get_enum(&self, name: &str) -> Option<&EnumDef> {
        self.enum_index.get(name).map(|&i| &self.enums[i])
    }

    pub fn get_typedef(&self, name: &str) -> Option<&TypedefDef> {
        self.typedef_index.get(name).map(|&i| &self.typedefs[i])
    }

    pub fn get_struct(&self, name: &str) -> Option<&StructDef> {
        self.struct_index.get(name).map(|&i| &self.structs[i])
    }

    /// Index of `name` in [`Schema::structs`].
    pub fn struct_position(&self, name: &str) -> Option<usize> {
        self.struct_index.get(name).copied()
    }

    pub fn get_service(&self, name: &str) -> Option<&ServiceDef> {
        self.service_index.get(name).map(|&i| &self.services[i])
    }

    pub fn get_const(&self, name: &str) -> Option<&ConstDef> {
        self.consts.iter().find(|c| c.name == name)
    }

    /// Follows typedef chains to the true type.
    pub fn resolve<'a>(&'a self, ty: &'a Type) -> Result<&'a Type, SchemaError> {
        let mut current = ty;
        // compiled schemas have no cycles; the bound covers hand-built types
        for _ in 0..=self.typedefs.len() {
            match current {
                Type::Typedef(name) => {
                    current = &self
                        .get_typedef(name)
                        .ok_or_else(|| SchemaError::undefined(name, "type resolution"))?
                        .target;
                }
                resolved => return Ok(resolved),
            }
        }
        Err(SchemaError::TypedefCycle(ty.to_string()))
    }

    /// The parent chain of `service`, excluding itself, nearest first.
    pub fn parents(&self, service: &str) -> Result<Vec<&ServiceDef>, SchemaError> {
        let svc = self
            .get_service(service)
            .ok_or_else(|| SchemaError::UndefinedService(service.to_string()))?;
        let mut chain = self.ancestry(svc)?;
        chain.remove(0);
        Ok(chain)
    }

    /// Flattened method table of `service`: inherited functions first (root
    /// service first), then the service's own. On a name collision the
    /// most-derived declaration wins.
    pub fn methods(&self, service: &str) -> Result<Vec<MethodRef<'_>>, SchemaError> {
        let svc = self
            .get_service(service)
            .ok_or_else(|| SchemaError::UndefinedService(service.to_string()))?;
        let chain = self.ancestry(svc)?;

        let mut methods: Vec<MethodRef<'_>> = Vec::new();
        for owner in chain.into_iter().rev() {
            for function in &owner.functions {
                let entry = MethodRef { owner, function };
                match methods.iter_mut().find(|m| m.function.name == function.name) {
                    Some(existing) => *existing = entry,
                    None => methods.push(entry),
                }
            }
        }
        Ok(methods)
    }

    /// Looks up one method in the flattened table of `service`.
    pub fn method(&self, service: &str, name: &str) -> Result<Option<MethodRef<'_>>, SchemaError> {
        Ok(self
            .methods(service)?
            .into_iter()
            .find(|m| m.function.name == name))
    }
}

fn collect_names(doc: &SchemaDocument) -> Result<HashMap<String, NameKind>, SchemaError> {
    let mut names = HashMap::new();
    let all = doc
        .enums
        .iter()
        .map(|e| (&e.name, NameKind::Enum))
        .chain(doc.typedefs.iter().map(|t| (&t.name, NameKind::Typedef)))
        .chain(doc.structs.iter().map(|s| (&s.name, NameKind::Struct)))
        .chain(doc.exceptions.iter().map(|s| (&s.name, NameKind::Exception)));
    for (name, kind) in all {
        if names.insert(name.clone(), kind).is_some() {
            return Err(SchemaError::DuplicateType(name.clone()));
        }
    }
    Ok(names)
}

fn resolve_expr(
    names: &HashMap<String, NameKind>,
    expr: &str,
    context: &str,
) -> Result<Type, SchemaError> {
    fn lower(
        names: &HashMap<String, NameKind>,
        expr: TypeExpr,
        context: &str,
    ) -> Result<Type, SchemaError> {
        Ok(match expr {
            TypeExpr::Base(ty) => ty,
            TypeExpr::Named(name) => match names.get(&name) {
                Some(NameKind::Enum) => Type::Enum(name),
                Some(NameKind::Typedef) => Type::Typedef(name),
                Some(NameKind::Struct) | Some(NameKind::Exception) => Type::Struct(name),
                None => return Err(SchemaError::undefined(name, context)),
            },
            TypeExpr::List(elem) => Type::list(lower(names, *elem, context)?),
            TypeExpr::Set(elem) => Type::set(lower(names, *elem, context)?),
            TypeExpr::Map(key, value) => {
                Type::map(lower(names, *key, context)?, lower(names, *value, context)?)
            }
        })
    }

    lower(names, TypeExpr::parse(expr)?, context)
}

fn compile_enum(doc: &crate::document::EnumDoc) -> Result<EnumDef, SchemaError> {
    let mut values = Vec::with_capacity(doc.values.len());
    let mut next = 0i32;
    let mut seen = HashSet::new();
    for v in &doc.values {
        let value = v.value().unwrap_or(next);
        if !seen.insert(v.name().to_string()) {
            return Err(SchemaError::DuplicateEnumValue {
                owner: doc.name.clone(),
                value: v.name().to_string(),
            });
        }
        values.push(EnumValue {
            name: v.name().to_string(),
            value,
        });
        next = value.wrapping_add(1);
    }
    Ok(EnumDef {
        name: doc.name.clone(),
        values,
    })
}

/// Lowers field documents, assigning missing ids and rejecting void fields.
fn compile_fields(
    names: &HashMap<String, NameKind>,
    owner: &str,
    docs: &[FieldDoc],
) -> Result<Vec<Field>, SchemaError> {
    let mut fields = Vec::with_capacity(docs.len());
    let mut next_id: i16 = 1;
    for doc in docs {
        let id = doc.id.unwrap_or(next_id);
        next_id = id.wrapping_add(1);

        let context = format!("{}.{}", owner, doc.name);
        let ty = resolve_expr(names, &doc.ty, &context)?;
        if ty.is_void() {
            return Err(SchemaError::VoidField {
                owner: owner.to_string(),
                field: doc.name.clone(),
            });
        }
        fields.push(Field {
            id,
            name: doc.name.clone(),
            ty,
            requiredness: doc.requiredness,
            default: doc.default.clone(),
        });
    }
    check_field_uniqueness(owner, &fields)?;
    Ok(fields)
}

fn check_field_uniqueness(owner: &str, fields: &[Field]) -> Result<(), SchemaError> {
    let mut ids = HashSet::new();
    let mut field_names = HashSet::new();
    for f in fields {
        if !ids.insert(f.id) {
            return Err(SchemaError::DuplicateFieldId {
                owner: owner.to_string(),
                id: f.id,
            });
        }
        if !field_names.insert(f.name.as_str()) {
            return Err(SchemaError::DuplicateFieldName {
                owner: owner.to_string(),
                name: f.name.clone(),
            });
        }
    }
    Ok(())
}

fn compile_struct(
    names: &HashMap<String, NameKind>,
    doc: &StructDoc,
    is_exception: bool,
) -> Result<StructDef, SchemaError> {
    Ok(StructDef {
        name: doc.name.clone(),
        fields: compile_fields(names, &doc.name, &doc.fields)?,
        is_exception,
        kind: StructKind::User,
        fingerprint: String::new(),
    })
}

fn compile_function(
    names: &HashMap<String, NameKind>,
    service: &str,
    doc: &crate::document::FunctionDoc,
) -> Result<FunctionDef, SchemaError> {
    let qualified = format!("{}.{}", service, doc.name);
    let return_type = resolve_expr(names, &doc.returns, &qualified)?;
    let args = compile_fields(names, &qualified, &doc.args)?;
    let throws = compile_fields(names, &qualified, &doc.throws)?;

    if doc.oneway && (!return_type.is_void() || !throws.is_empty()) {
        return Err(SchemaError::InvalidOneway {
            function: qualified,
        });
    }

    Ok(FunctionDef {
        name: doc.name.clone(),
        return_type,
        args,
        throws,
        oneway: doc.oneway,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::ConstValue;

    const GEO: &str = r#"
enums:
  - name: Unit
    values: [METERS, FEET, {name: MILES, value: 10}, LEAGUES]
typedefs:
  - {name: Meters, type: i32}
  - {name: Distance, type: Meters}
structs:
  - name: Point
    fields:
      - {id: 1, name: x, type: i32, requiredness: required}
      - {id: 2, name: y, type: i32, requiredness: required}
  - name: Tree
    fields:
      - {id: 1, name: label, type: string}
      - {id: 2, name: children, type: list<Tree>, requiredness: optional}
exceptions:
  - name: OutOfRange
    fields:
      - {id: 1, name: reason, type: string}
consts:
  - {name: ORIGIN, type: Point, value: {x: 0, y: 0}}
  - {name: DEFAULT_UNIT, type: Unit, value: Unit.FEET}
  - {name: LIMITS, type: "map<i32,string>", value: {"1": one, "2": two}}
services:
  - name: Base
    functions:
      - name: ping
        oneway: true
  - name: Geo
    extends: Base
    functions:
      - name: dist
        returns: Distance
        args:
          - {name: a, type: Point}
          - {name: b, type: Point}
        throws:
          - {id: 1, name: range, type: OutOfRange}
      - name: reset
"#;

    fn geo() -> Schema {
        Schema::from_yaml_str(GEO).unwrap()
    }

    fn expect_err(yaml: &str) -> SchemaError {
        match Schema::from_yaml_str(yaml) {
            Ok(_) => panic!("schema should not compile"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_enum_values_continue_from_previous() {
        let schema = geo();
        let unit = schema.get_enum("Unit").unwrap();
        let values: Vec<i32> = unit.values.iter().map(|v| v.value).collect();
        assert_eq!(values, vec![0, 1, 10, 11]);
    }

    #[test]
    fn test_typedef_resolution() {
        let schema = geo();
        let ty = Type::Typedef("Distance".into());
        assert_eq!(schema.resolve(&ty).unwrap(), &Type::I32);
        assert_eq!(schema.resolve(&Type::Bool).unwrap(), &Type::Bool);
    }

    #[test]
    fn test_self_referential_struct() {
        let schema = geo();
        let tree = schema.get_struct("Tree").unwrap();
        assert_eq!(
            tree.field(2).unwrap().ty,
            Type::list(Type::Struct("Tree".into()))
        );
        assert!(!tree.fingerprint.is_empty());
    }

    #[test]
    fn test_synthetic_structs() {
        let schema = geo();

        let args = schema.get_struct("Geo_dist_args").unwrap();
        assert_eq!(args.kind, StructKind::Args);
        let ids: Vec<i16> = args.fields.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 2]);

        let result = schema.get_struct("Geo_dist_result").unwrap();
        assert_eq!(result.kind, StructKind::Result);
        assert_eq!(result.fields.len(), 2);
        assert_eq!(result.fields[0].id, SUCCESS_FIELD_ID);
        assert_eq!(result.fields[0].name, "success");
        assert_eq!(result.fields[0].ty, Type::Typedef("Distance".into()));
        assert_eq!(result.fields[1].name, "range");
        assert!(result.fields.iter().all(|f| f.is_optional()));

        // void return: no success slot
        let reset = schema.get_struct("Geo_reset_result").unwrap();
        assert!(reset.fields.is_empty());

        // oneway: args only
        assert!(schema.get_struct("Base_ping_args").is_some());
        assert!(schema.get_struct("Base_ping_result").is_none());

        assert_eq!(schema.user_structs().count(), 3);
    }

    #[test]
    fn test_flattened_methods() {
        let schema = geo();
        let methods = schema.methods("Geo").unwrap();
        let names: Vec<&str> = methods.iter().map(|m| m.function.name.as_str()).collect();
        assert_eq!(names, vec!["ping", "dist", "reset"]);
        assert_eq!(methods[0].owner.name, "Base");
        assert_eq!(methods[0].args_struct(), "Base_ping_args");
        assert_eq!(methods[1].result_struct(), "Geo_dist_result");

        let parents = schema.parents("Geo").unwrap();
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].name, "Base");
        assert!(schema.method("Geo", "nope").unwrap().is_none());
    }

    #[test]
    fn test_constants_are_normalized() {
        let schema = geo();
        let origin = schema.get_const("ORIGIN").unwrap();
        assert_eq!(origin.struct_member("x"), Some(&ConstValue::Integer(0)));

        let unit = schema.get_const("DEFAULT_UNIT").unwrap();
        assert_eq!(unit.value, ConstValue::Integer(1));

        let limits = schema.get_const("LIMITS").unwrap();
        let ConstValue::Map(entries) = &limits.value else {
            panic!("expected a map");
        };
        assert!(entries.contains(&(ConstValue::Integer(1), ConstValue::String("one".into()))));
    }

    #[test]
    fn test_void_field_rejected() {
        let err = expect_err(
            r#"
structs:
  - name: Bad
    fields: [{id: 1, name: nothing, type: void}]
"#,
        );
        assert!(matches!(err, SchemaError::VoidField { ref field, .. } if field == "nothing"));
    }

    #[test]
    fn test_undefined_type_rejected() {
        let err = expect_err(
            r#"
structs:
  - name: Bad
    fields: [{id: 1, name: p, type: list<Missing>}]
"#,
        );
        assert!(matches!(err, SchemaError::UndefinedType { ref name, .. } if name == "Missing"));
    }

    #[test]
    fn test_duplicate_field_id_rejected() {
        let err = expect_err(
            r#"
structs:
  - name: Bad
    fields:
      - {id: 1, name: a, type: i32}
      - {id: 1, name: b, type: i32}
"#,
        );
        assert!(matches!(err, SchemaError::DuplicateFieldId { id: 1, .. }));
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let err = expect_err(
            r#"
enums: [{name: Thing, values: [A]}]
structs: [{name: Thing}]
"#,
        );
        assert!(matches!(err, SchemaError::DuplicateType(ref n) if n == "Thing"));
    }

    #[test]
    fn test_typedef_cycle_rejected() {
        let err = expect_err(
            r#"
typedefs:
  - {name: A, type: B}
  - {name: B, type: A}
"#,
        );
        assert!(matches!(err, SchemaError::TypedefCycle(_)));
    }

    #[test]
    fn test_service_errors() {
        let err = expect_err(
            r#"
services:
  - {name: Child, extends: Missing}
"#,
        );
        assert!(matches!(err, SchemaError::UndefinedService(ref s) if s == "Missing"));

        let err = expect_err(
            r#"
services:
  - {name: A, extends: B}
  - {name: B, extends: A}
"#,
        );
        assert!(matches!(err, SchemaError::ServiceCycle(_)));

        let err = expect_err(
            r#"
services:
  - {name: Base, functions: [{name: get}]}
  - {name: Child, extends: Base, functions: [{name: get}]}
"#,
        );
        assert!(matches!(err, SchemaError::DuplicateMethod { ref method, .. } if method == "get"));
    }

    #[test]
    fn test_throws_must_name_exception() {
        let err = expect_err(
            r#"
structs: [{name: NotAnError}]
services:
  - name: S
    functions:
      - name: f
        throws: [{id: 1, name: e, type: NotAnError}]
"#,
        );
        assert!(matches!(err, SchemaError::NotAnException { .. }));
    }

    #[test]
    fn test_oneway_must_be_void() {
        let err = expect_err(
            r#"
services:
  - name: S
    functions: [{name: f, returns: i32, oneway: true}]
"#,
        );
        assert!(matches!(err, SchemaError::InvalidOneway { .. }));
    }

    #[test]
    fn test_const_with_undefined_field() {
        let err = expect_err(
            r#"
structs:
  - name: Point
    fields: [{id: 1, name: x, type: i32}]
consts:
  - {name: P, type: Point, value: {x: 1, z: 2}}
"#,
        );
        assert!(matches!(err, SchemaError::UndefinedField { ref field, .. } if field == "z"));
    }

    #[test]
    fn test_const_type_mismatch() {
        let err = expect_err(
            r#"
consts:
  - {name: SMALL, type: byte, value: 300}
"#,
        );
        assert!(matches!(err, SchemaError::InvalidConstant { ref name, .. } if name == "SMALL"));
    }

    #[test]
    fn test_field_defaults_are_checked() {
        let schema = Schema::from_yaml_str(
            r#"
enums: [{name: Mode, values: [FAST, SLOW]}]
structs:
  - name: Opts
    fields:
      - {id: 1, name: mode, type: Mode, default: SLOW}
      - {id: 2, name: ratio, type: double, default: 2}
"#,
        )
        .unwrap();
        let opts = schema.get_struct("Opts").unwrap();
        assert_eq!(opts.fields[0].default, Some(ConstValue::Integer(1)));
        assert_eq!(opts.fields[1].default, Some(ConstValue::Double(2.0)));
    }
}
