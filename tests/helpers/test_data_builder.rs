// ==========================================
// Test data builders
// ==========================================

use materiales_costing::domain::{
    Calculo, HeaderAtributoInput, HeaderBaseCalc, MaterialAtributo, MaterialCreate, Operacion,
    OperationKind, TipoMaterialCreate,
};

// ==========================================
// TipoMaterialCreate builder
// ==========================================

pub struct TipoMaterialBuilder {
    titulo: String,
    base_active: Vec<i64>,
    atributos: Vec<HeaderAtributoInput>,
    calculations: Vec<HeaderBaseCalc>,
    valor_dolar: Option<f64>,
}

impl TipoMaterialBuilder {
    pub fn new(titulo: &str) -> Self {
        Self {
            titulo: titulo.to_string(),
            base_active: Vec::new(),
            atributos: Vec::new(),
            calculations: Vec::new(),
            valor_dolar: None,
        }
    }

    /// Quantity (2) active
    pub fn with_cantidad(mut self) -> Self {
        self.base_active.push(2);
        self
    }

    /// Unit (3) active
    pub fn with_unidad(mut self) -> Self {
        self.base_active.push(3);
        self
    }

    /// Plain text attribute with an explicit id
    pub fn atributo(mut self, id: i64, titulo: &str) -> Self {
        let mut header = HeaderAtributoInput::new(titulo);
        header.id_header_atribute = Some(id);
        self.atributos.push(header);
        self
    }

    /// Quantity-flagged attribute with an explicit id
    pub fn atributo_cantidad(mut self, id: i64, titulo: &str) -> Self {
        let mut header = HeaderAtributoInput::new(titulo);
        header.id_header_atribute = Some(id);
        header.is_cantidad = true;
        self.atributos.push(header);
        self
    }

    /// Attribute computed by a single operation
    pub fn atributo_formula(
        mut self,
        id: i64,
        titulo: &str,
        tipo: OperationKind,
        headers_base: Vec<i64>,
        headers_atributes: Vec<i64>,
    ) -> Self {
        let mut header = HeaderAtributoInput::new(titulo);
        header.id_header_atribute = Some(id);
        header.calculo = Some(Calculo {
            activo: true,
            is_multiple: false,
            operaciones: vec![Operacion::new(tipo, headers_base, headers_atributes)],
        });
        self.atributos.push(header);
        self
    }

    /// Overrides the formula of a base header
    pub fn base_calculo(mut self, id_header_base: i64, calculo: Calculo) -> Self {
        self.calculations.push(HeaderBaseCalc {
            id_header_base,
            calculo: Some(calculo),
            ..Default::default()
        });
        self
    }

    pub fn valor_dolar(mut self, valor: f64) -> Self {
        self.valor_dolar = Some(valor);
        self
    }

    pub fn build(self) -> TipoMaterialCreate {
        TipoMaterialCreate {
            titulo: self.titulo,
            headers_base_active: Some(self.base_active),
            headers_base_calculations: if self.calculations.is_empty() {
                None
            } else {
                Some(self.calculations)
            },
            headers_atributes: Some(self.atributos),
            order_headers: None,
            valor_dolar: self.valor_dolar,
        }
    }
}

// ==========================================
// MaterialCreate builder
// ==========================================

pub struct MaterialBuilder {
    payload: MaterialCreate,
}

impl MaterialBuilder {
    pub fn new(id_tipo_material: i64, detalle: &str) -> Self {
        Self {
            payload: MaterialCreate {
                id_tipo_material,
                detalle: Some(detalle.to_string()),
                ..Default::default()
            },
        }
    }

    pub fn cantidad(mut self, cantidad: &str) -> Self {
        self.payload.cantidad = Some(cantidad.to_string());
        self
    }

    pub fn unidad(mut self, unidad: &str) -> Self {
        self.payload.unidad = Some(unidad.to_string());
        self
    }

    pub fn costo_unitario(mut self, costo: f64) -> Self {
        self.payload.costo_unitario = Some(costo);
        self
    }

    pub fn atributo(mut self, id: i64, value: &str) -> Self {
        self.payload
            .atributos
            .get_or_insert_with(Vec::new)
            .push(MaterialAtributo::new(id, value));
        self
    }

    pub fn build(self) -> MaterialCreate {
        self.payload
    }
}
